//! Error types

use std::time::Duration;
use thiserror::Error;

/// Startup-time errors. Nothing in here is raised once polling has begun.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown source: {0}")]
    UnknownSource(String),

    #[error("Duplicate source: {0}")]
    DuplicateSource(String),

    #[error("Invalid trading pair: {0} (expected BASE/QUOTE)")]
    InvalidPair(String),
}

/// Failure of a single source adapter call
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdapterError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Rate limited")]
    RateLimited,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Adapter call panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias
pub type CoreResult<T> = Result<T, CoreError>;
pub type AdapterResult<T> = Result<T, AdapterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            CoreError::UnknownSource("bitstamp".into()).to_string(),
            "Unknown source: bitstamp"
        );
        assert_eq!(
            AdapterError::Http { status: 503, body: "down".into() }.to_string(),
            "HTTP 503: down"
        );
        assert_eq!(
            AdapterError::Timeout(Duration::from_millis(1500)).to_string(),
            "Timed out after 1.5s"
        );
    }
}
