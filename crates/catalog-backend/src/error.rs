//! Backend error types
//!
//! Failures that cross the remote-procedure boundary: transport problems,
//! rejections by the backend's own validation, and missing records.

use thiserror::Error;

/// Result type alias for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Backend-specific errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// Network or RPC-level failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// The call did not complete in time
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Record already exists (duplicate)
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Backend validation rejected the request
    #[error("Rejected: {0}")]
    Rejected(String),

    /// Remote API budget exhausted
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Response could not be interpreted
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Internal backend error
    #[error("Internal backend error: {0}")]
    Internal(String),

    /// Domain error from core crate
    #[error("Domain error: {0}")]
    Domain(#[from] catalog_core::CatalogError),
}

impl BackendError {
    /// Check if this error is a not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, BackendError::NotFound(_))
    }

    /// Check if this is a duplicate/already exists error
    pub fn is_already_exists(&self) -> bool {
        matches!(self, BackendError::AlreadyExists(_))
    }

    /// Check if the request itself was malformed or refused
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            BackendError::Rejected(_) | BackendError::AlreadyExists(_) | BackendError::Domain(_)
        )
    }

    /// Check if this is a transient error that could be retried
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BackendError::Transport(_) | BackendError::Timeout(_) | BackendError::RateLimited(_)
        )
    }
}

/// Convert serde_json errors
impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::InvalidData(format!("{}", err))
    }
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::Transport(format!("I/O error: {}", err))
    }
}
