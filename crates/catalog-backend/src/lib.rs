//! Backend boundary for Catalog Sync
//!
//! This crate defines the remote-procedure surface the catalog engine talks
//! to, including:
//! - The `CatalogBackend` trait (repositories, items, sync, import, registry)
//! - Backend error types with transient/validation classification
//! - An in-memory implementation that performs authoritative sync merges
//! - JSON fixtures for starting the in-memory backend from a known state
//!
//! # Example
//!
//! ```rust,no_run
//! use catalog_backend::{CatalogBackend, InMemoryBackend, RemoteAsset};
//! use catalog_core::{AssetKind, RepoDescriptor};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = InMemoryBackend::new();
//! let repo = backend.add_repo(RepoDescriptor::new("acme", "kit")).await?;
//!
//! backend
//!     .stage_remote("acme/kit", vec![RemoteAsset::new("skills/pdf", "PDF", AssetKind::Skill)])
//!     .await;
//! let outcome = backend.sync_repo(&repo.id).await?;
//! assert_eq!(outcome.added, 1);
//! # Ok(())
//! # }
//! ```

// Re-export core domain types for convenience
pub use catalog_core;

// Public modules
pub mod backend;
pub mod error;
pub mod fixture;
pub mod memory;

// Re-exports for convenience
pub use backend::{CatalogBackend, ImportResult, DEFAULT_SEARCH_LIMIT};
pub use error::{BackendError, BackendResult};
pub use fixture::Fixture;
pub use memory::{
    starter_repos, AssetOrigin, InMemoryBackend, InMemoryConfig, LocalAssetRecord, Operation,
    RemoteAsset, DEFAULT_REGISTRY_PAGE_SIZE,
};

/// Backend layer version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_backend_is_object_safe() {
        let backend: std::sync::Arc<dyn CatalogBackend> = std::sync::Arc::new(InMemoryBackend::new());
        drop(backend);
    }
}
