use thiserror::Error;

/// Errors raised inside the generation path.
///
/// The orchestrator never returns these to its callers; they are rendered
/// into the result's `error_message` or `warnings`.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The generation capability failed or reported an unsuccessful result.
    #[error("{0}")]
    GenerationFailure(String),
    /// Quality analysis or rule validation failed; generation itself succeeded.
    #[error("{0}")]
    ValidationDegraded(String),
    #[error("panic during generation: {0}")]
    Panicked(String),
    #[error("generation task aborted: {0}")]
    Join(String),
}
