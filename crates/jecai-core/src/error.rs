use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("malformed CNJ case number: {0:?}")]
    MalformedCaseNumber(String),

    #[error("invalid marker label: {0:?}")]
    InvalidLabel(String),

    #[error("history JSON error: {0}")]
    HistoryJson(#[from] serde_json::Error),

    #[error("unsupported history version {0}")]
    UnsupportedVersion(u32),
}
