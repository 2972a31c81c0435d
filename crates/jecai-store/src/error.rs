use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no case with id {0}")]
    NotFound(i64),

    #[cfg(feature = "duckdb")]
    #[error("duckdb error: {0}")]
    DuckDb(#[from] ::duckdb::Error),

    #[error("history error: {0}")]
    History(#[from] jecai_core::CoreError),
}
