use thiserror::Error;

/// Core error type shared across testweave crates.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A dependency edge violates internal invariants.
    #[error("invalid dependency: {0}")]
    InvalidDependency(String),
    /// A strength level outside the 1..=5 scale.
    #[error("invalid dependency strength level: {0}")]
    InvalidStrength(u8),
}

/// Convenience alias for results returned by the core crate.
pub type Result<T> = std::result::Result<T, CoreError>;
