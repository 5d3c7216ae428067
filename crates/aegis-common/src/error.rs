//! Common error types for Aegis components.

use thiserror::Error;

/// Common errors across Aegis components
#[derive(Debug, Error)]
pub enum AegisError {
    /// Configuration error (missing/invalid site key, bad interval)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upstream token provider failure
    #[error("Provider error: {0}")]
    Provider(String),

    /// Local validation gate rejected the request
    #[error("Validation rejected: {0}")]
    ValidationRejected(String),

    /// Execution was superseded by a reset or a newer execution
    #[error("Execution superseded: {0}")]
    Superseded(String),

    /// Invalid input/request
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Timeout
    #[error("Operation timed out: {0}")]
    Timeout(String),
}

impl AegisError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Config(_) => 500,
            Self::Provider(_) => 502,
            Self::ValidationRejected(_) => 422,
            Self::Superseded(_) => 409,
            Self::InvalidInput(_) => 400,
            Self::Internal(_) => 500,
            Self::Timeout(_) => 504,
        }
    }

    /// Returns true if this error should be retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Provider(_) | Self::Timeout(_))
    }
}
