//! Backend trait abstraction for the catalog's remote-procedure boundary
//!
//! This module defines the CatalogBackend trait that the service layer talks
//! to, allowing for different implementations (an RPC bridge to the host
//! application, the in-memory backend, test doubles, etc.).

use async_trait::async_trait;
use catalog_core::{
    AssetKind, CatalogItem, ItemId, LocalAssetId, RateLimitStatus, RegistryEntry, RegistryPage,
    RepoDescriptor, RepoId, SourceRepo, SyncOutcome,
};
use serde::{Deserialize, Serialize};

use crate::error::BackendResult;

/// Default number of entries requested by a registry search
pub const DEFAULT_SEARCH_LIMIT: usize = 20;

/// Response of a catalog item import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    /// Whether the backend created the local asset
    pub success: bool,

    /// Kind of the created asset
    pub asset_kind: AssetKind,

    /// Identity of the created asset
    pub asset_id: LocalAssetId,
}

/// Backend trait for catalog operations
///
/// Implementations must be thread-safe (Send + Sync) for use in async
/// contexts. Sync passes are merged authoritatively on the backend side;
/// callers reload item sets afterwards instead of applying deltas.
#[async_trait]
pub trait CatalogBackend: Send + Sync {
    /// List every tracked source repository
    async fn list_repos(&self) -> BackendResult<Vec<SourceRepo>>;

    /// Add a source repository
    ///
    /// # Returns
    /// * `Ok(SourceRepo)` - The created repository
    /// * `Err(BackendError::AlreadyExists)` - If the remote is already tracked
    /// * `Err(BackendError::Rejected)` - If the backend refuses the descriptor
    async fn add_repo(&self, descriptor: RepoDescriptor) -> BackendResult<SourceRepo>;

    /// Remove a repository together with all of its items
    async fn remove_repo(&self, id: &RepoId) -> BackendResult<()>;

    /// Enable or disable a repository
    async fn toggle_repo(&self, id: &RepoId, enabled: bool) -> BackendResult<()>;

    /// List catalog items, for one repository or for all when `repo_id` is `None`
    async fn list_items(&self, repo_id: Option<&RepoId>) -> BackendResult<Vec<CatalogItem>>;

    /// Run one sync pass for a repository
    async fn sync_repo(&self, id: &RepoId) -> BackendResult<SyncOutcome>;

    /// Run a sync pass over every enabled repository in one request
    async fn sync_all_repos(&self) -> BackendResult<SyncOutcome>;

    /// Import a catalog item as a local asset
    async fn import_item(&self, item_id: &ItemId) -> BackendResult<ImportResult>;

    /// Search the registry; one complete, non-paginated result list
    async fn search_registry(&self, query: &str, limit: usize) -> BackendResult<Vec<RegistryEntry>>;

    /// List the registry one page at a time
    async fn list_registry(&self, cursor: Option<&str>) -> BackendResult<RegistryPage>;

    /// Import a registry entry as a local asset
    async fn import_registry_entry(&self, entry: &RegistryEntry) -> BackendResult<LocalAssetId>;

    /// Current remote API rate-limit status
    async fn get_rate_limit(&self) -> BackendResult<RateLimitStatus>;

    /// Add the starter repository set; repositories already tracked are skipped
    async fn seed_default_repos(&self) -> BackendResult<()>;

    /// Health check - verify the backend is reachable
    async fn health_check(&self) -> BackendResult<()> {
        self.list_repos().await.map(|_| ())
    }
}
