use thiserror::Error;

/// Errors emitted while preparing pipeline input.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("invalid validation context: {0}")]
    InvalidContext(String),
    #[error("invalid records: {0}")]
    InvalidRecords(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EvalError>;
