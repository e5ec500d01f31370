//! Error types for the Clarity Assistant service
//!
//! Routing outcomes are never errors: the message router turns every failure
//! into an `{ok:false, ...}` reply. These types cover startup, configuration
//! and storage plumbing.

use thiserror::Error;

/// Crate-wide error type
#[derive(Debug, Error)]
pub enum ClarityError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<config::ConfigError> for ClarityError {
    fn from(err: config::ConfigError) -> Self {
        ClarityError::Config(err.to_string())
    }
}

impl From<reqwest::Error> for ClarityError {
    fn from(err: reqwest::Error) -> Self {
        ClarityError::Http(err.to_string())
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, ClarityError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ClarityError::Storage("disk full".to_string());
        assert_eq!(err.to_string(), "Storage error: disk full");
    }

    #[test]
    fn test_from_serde_error() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: ClarityError = parse_err.into();
        assert!(matches!(err, ClarityError::Serialization(_)));
    }
}
