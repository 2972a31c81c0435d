//! Storage layer: the `processos` case table in DuckDB.

mod error;
pub use error::StoreError;

#[cfg(feature = "duckdb")]
mod cases;
#[cfg(feature = "duckdb")]
pub use cases::CaseStore;
