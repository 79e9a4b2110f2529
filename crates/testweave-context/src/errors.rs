use testweave_core::CoreError;
use thiserror::Error;

/// Errors returned by context store operations.
#[derive(Debug, Error)]
pub enum ContextError {
    /// No context is registered under this id.
    #[error("context not found: {0}")]
    ContextNotFound(String),
    #[error("invalid context name: '{0}'")]
    InvalidName(String),
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for context store operations.
pub type Result<T> = std::result::Result<T, ContextError>;
