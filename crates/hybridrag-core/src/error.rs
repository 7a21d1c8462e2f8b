use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Weight pair rejected because `alpha + beta` is not 1.
    #[error("Invalid weights: alpha ({alpha}) + beta ({beta}) must equal 1")]
    InvalidWeights { alpha: f32, beta: f32 },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Rate limited by provider (retry after {retry_after_ms:?}ms)")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Provider timed out: {0}")]
    Timeout(String),

    #[error("Invalid provider input: {0}")]
    InvalidInput(String),

    #[error("Provider failed: {0}")]
    Provider(String),

    #[error("Vector index failure: {0}")]
    VectorIndex(String),

    #[error("Operation failed: {0}")]
    Operation(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Only provider rate limiting is worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::RateLimited { .. })
    }

    /// Provider-suggested wait before the next attempt, if any.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Error::RateLimited { retry_after_ms } => *retry_after_ms,
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
