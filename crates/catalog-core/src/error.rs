//! Error types for the catalog domain

use thiserror::Error;

/// Result type alias for domain operations
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Main error type for domain-level validation and parsing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// A required descriptor field is missing or blank
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// A field is present but malformed
    #[error("Invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// Unknown asset kind string
    #[error("Invalid asset kind: {0}")]
    InvalidAssetKind(String),

    /// Unknown repository layout string
    #[error("Invalid repository layout: {0}")]
    InvalidLayout(String),

    /// Repository locator could not be understood
    #[error("Invalid repository locator: {0}")]
    InvalidLocator(String),

    /// Identifier could not be parsed
    #[error("Invalid identifier: {0}")]
    InvalidId(String),

    /// Serialization/Deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl CatalogError {
    /// Shorthand for an [`CatalogError::InvalidField`]
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        CatalogError::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::SerializationError(err.to_string())
    }
}
