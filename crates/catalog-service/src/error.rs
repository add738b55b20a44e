//! Service-layer error types
//!
//! This module defines error types specific to the service layer,
//! mapping domain and backend errors to service-level errors.

use catalog_backend::BackendError;
use catalog_core::CatalogError;
use thiserror::Error;

/// Result type alias for service operations
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Service-layer error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Repository, item or entry not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Record already exists (duplicate repository)
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// The catalog item already has a local asset
    #[error("Already imported: {0}")]
    AlreadyImported(String),

    /// The backend answered an import without creating the asset
    #[error("Import rejected: {0}")]
    ImportRejected(String),

    /// Validation failed
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// Backend failure that is not a validation problem
    #[error("Backend error: {0}")]
    Backend(BackendError),

    /// Internal service error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Check if retrying the same call could succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, ServiceError::Backend(err) if err.is_transient())
    }

    /// Check if this error is a not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::NotFound(_))
    }
}

impl From<CatalogError> for ServiceError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::SerializationError(msg) => ServiceError::Internal(msg),
            other => ServiceError::ValidationFailed(other.to_string()),
        }
    }
}

impl From<BackendError> for ServiceError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NotFound(msg) => ServiceError::NotFound(msg),
            BackendError::AlreadyExists(msg) => ServiceError::AlreadyExists(msg),
            BackendError::Rejected(msg) => ServiceError::ValidationFailed(msg),
            BackendError::Domain(err) => ServiceError::from(err),
            other => ServiceError::Backend(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_from_backend_error() {
        let err: ServiceError = BackendError::NotFound("repo".to_string()).into();
        assert!(err.is_not_found());

        let err: ServiceError = BackendError::Rejected("owner does not exist".to_string()).into();
        assert!(matches!(err, ServiceError::ValidationFailed(_)));

        let err: ServiceError = BackendError::Timeout("sync".to_string()).into();
        assert!(err.is_transient());
    }

    #[test]
    fn test_service_error_from_domain_error() {
        let err: ServiceError = CatalogError::MissingField("owner").into();
        assert!(matches!(err, ServiceError::ValidationFailed(_)));

        let nested: ServiceError = BackendError::Domain(CatalogError::MissingField("name")).into();
        assert!(matches!(nested, ServiceError::ValidationFailed(_)));
    }

    #[test]
    fn test_service_error_display() {
        let err = ServiceError::ValidationFailed("Invalid name".to_string());
        assert_eq!(err.to_string(), "Validation failed: Invalid name");

        let err = ServiceError::Backend(BackendError::Transport("reset".to_string()));
        assert_eq!(err.to_string(), "Backend error: Transport error: reset");
    }
}
