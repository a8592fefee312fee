//! Error types for the document store layer

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Store error types
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Document or collection not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not allowed to read or write
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Request rejected by the store
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation conflict (concurrent modification)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Store temporarily unavailable
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Timeout occurred
    #[error("Timeout: operation took longer than {0:?}")]
    Timeout(Duration),

    /// Generic error wrapper
    #[error("Store error: {0}")]
    Other(#[from] anyhow::Error),
}

impl StoreError {
    pub fn serialization<E: fmt::Display>(err: E) -> Self {
        Self::Serialization(err.to_string())
    }

    pub fn not_found<E: fmt::Display>(item: E) -> Self {
        Self::NotFound(item.to_string())
    }

    pub fn permission_denied<E: fmt::Display>(msg: E) -> Self {
        Self::PermissionDenied(msg.to_string())
    }

    pub fn invalid_argument<E: fmt::Display>(msg: E) -> Self {
        Self::InvalidArgument(msg.to_string())
    }

    pub fn unavailable<E: fmt::Display>(msg: E) -> Self {
        Self::Unavailable(msg.to_string())
    }

    pub fn connection<E: fmt::Display>(msg: E) -> Self {
        Self::Connection(msg.to_string())
    }

    /// Check if this is a transient error worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Unavailable(_) | Self::Connection(_) | Self::Timeout(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(StoreError::unavailable("503").is_retryable());
        assert!(StoreError::connection("reset").is_retryable());
        assert!(StoreError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(!StoreError::permission_denied("no admin claim").is_retryable());
        assert!(!StoreError::not_found("logs/1").is_retryable());
        assert!(!StoreError::invalid_argument("batch too large").is_retryable());
    }

    #[test]
    fn test_timeout_message() {
        let err = StoreError::Timeout(Duration::from_millis(250));
        assert_eq!(err.to_string(), "Timeout: operation took longer than 250ms");
    }
}
