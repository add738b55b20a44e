//! Service layer for Catalog Sync
//!
//! This crate holds the stateful engine that sits between a consumer (a UI,
//! the CLI) and the backend boundary. It owns the local mirror of
//! repositories, items and registry results and keeps them consistent with
//! the backend.
//!
//! # Architecture
//!
//! - **RepoCatalog**: tracked source repositories, with cascading removal
//! - **ItemStore**: the flat set of discovered catalog items
//! - **SyncCoordinator**: single-flight sync passes followed by item reloads
//! - **RegistryPager**: cursor-based registry browsing with deduplication
//! - **ImportReconciler**: item/entry import plus downstream refresh
//! - **RateLimitMonitor**: advisory remote API budget
//!
//! [`CatalogLibrary`] wires them together and exposes their state as
//! getters plus a change-event subscription.
//!
//! # Example
//!
//! ```rust,no_run
//! use catalog_backend::InMemoryBackend;
//! use catalog_core::{RepoDescriptor, TypeFilter};
//! use catalog_service::CatalogLibrary;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let library = CatalogLibrary::builder()
//!     .backend(Arc::new(InMemoryBackend::new()))
//!     .build()?;
//! library.initialize().await;
//!
//! let repo = library.repo_catalog().add(RepoDescriptor::parse("acme/kit")?).await?;
//! library.sync().sync_one(&repo.id).await?;
//! let skills = library.filtered_items("pdf", "skill".parse()?).await;
//! # let _ = (skills, TypeFilter::All);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod import;
pub mod items;
pub mod pager;
pub mod rate_limit;
pub mod repos;
pub mod status;
pub mod sync;

// Re-export main types for convenience
pub use config::LibraryConfig;
pub use error::{ServiceError, ServiceResult};
pub use events::{EventConfig, EventHub, DEFAULT_EVENT_CAPACITY};
pub use import::{ImportReconciler, ImportTarget, NoopRefresher, Refresher};
pub use items::ItemStore;
pub use pager::{FetchOutcome, PagerConfig, RegistryPager, DEFAULT_MAX_PAGES};
pub use rate_limit::RateLimitMonitor;
pub use repos::RepoCatalog;
pub use status::{ErrorSlot, InFlight, InFlightGuard};
pub use sync::SyncCoordinator;

use catalog_backend::CatalogBackend;
use catalog_core::{
    CatalogEvent, CatalogItem, RateLimitStatus, RegistryEntry, SourceRepo, TypeFilter,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, instrument};

/// The catalog engine with every component wired to one backend
#[derive(Clone)]
pub struct CatalogLibrary {
    repos: Arc<RepoCatalog>,
    items: Arc<ItemStore>,
    sync: Arc<SyncCoordinator>,
    registry: Arc<RegistryPager>,
    importer: Arc<ImportReconciler>,
    rate_limit: Arc<RateLimitMonitor>,
    error: ErrorSlot,
    events: EventHub,
}

impl CatalogLibrary {
    /// Create a library with default configuration and no downstream libraries
    pub fn new(backend: Arc<dyn CatalogBackend>) -> Self {
        Self::assemble(backend, Arc::new(NoopRefresher), LibraryConfig::default())
    }

    pub fn builder() -> CatalogLibraryBuilder {
        CatalogLibraryBuilder::new()
    }

    fn assemble(
        backend: Arc<dyn CatalogBackend>,
        refresher: Arc<dyn Refresher>,
        config: LibraryConfig,
    ) -> Self {
        let events = EventHub::new(config.events.capacity);
        let error = ErrorSlot::new(events.clone());
        let registry_error = ErrorSlot::new(events.clone());

        let items = Arc::new(ItemStore::new(backend.clone(), error.clone(), events.clone()));
        let repos = Arc::new(RepoCatalog::new(
            backend.clone(),
            items.clone(),
            error.clone(),
            events.clone(),
        ));
        let sync = Arc::new(SyncCoordinator::new(
            backend.clone(),
            repos.clone(),
            items.clone(),
            error.clone(),
            events.clone(),
        ));
        let registry = Arc::new(RegistryPager::new(
            backend.clone(),
            config.registry,
            registry_error,
            events.clone(),
        ));
        let importer = Arc::new(ImportReconciler::new(
            backend.clone(),
            items.clone(),
            refresher,
            error.clone(),
            events.clone(),
        ));
        let rate_limit = Arc::new(RateLimitMonitor::new(backend, error.clone(), events.clone()));

        Self {
            repos,
            items,
            sync,
            registry,
            importer,
            rate_limit,
            error,
            events,
        }
    }

    /// Passive mount-time loads: repositories, items and rate limit.
    /// Failures end up in [`error`](Self::error), never in a return value.
    #[instrument(skip(self))]
    pub async fn initialize(&self) {
        debug!("Initializing catalog library");
        tokio::join!(
            self.repos.load(),
            self.items.load(None),
            self.rate_limit.check()
        );
    }

    /// Receive change events from every component
    pub fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.events.subscribe()
    }

    pub fn repo_catalog(&self) -> &Arc<RepoCatalog> {
        &self.repos
    }

    pub fn item_store(&self) -> &Arc<ItemStore> {
        &self.items
    }

    pub fn sync(&self) -> &Arc<SyncCoordinator> {
        &self.sync
    }

    pub fn registry(&self) -> &Arc<RegistryPager> {
        &self.registry
    }

    pub fn importer(&self) -> &Arc<ImportReconciler> {
        &self.importer
    }

    pub fn rate_limit(&self) -> &Arc<RateLimitMonitor> {
        &self.rate_limit
    }

    pub async fn repos(&self) -> Vec<SourceRepo> {
        self.repos.repos().await
    }

    pub async fn items(&self) -> Vec<CatalogItem> {
        self.items.items().await
    }

    pub async fn registry_results(&self) -> Vec<RegistryEntry> {
        self.registry.results().await
    }

    pub fn is_loading(&self) -> bool {
        self.repos.is_loading() || self.items.is_loading()
    }

    pub fn is_syncing(&self) -> bool {
        self.sync.is_syncing()
    }

    pub fn is_searching_registry(&self) -> bool {
        self.registry.is_searching()
    }

    /// Last error of the repository, item, sync, import and rate-limit operations
    pub async fn error(&self) -> Option<String> {
        self.error.get().await
    }

    pub async fn registry_error(&self) -> Option<String> {
        self.registry.registry_error().await
    }

    pub async fn rate_limit_info(&self) -> Option<RateLimitStatus> {
        self.rate_limit.status().await
    }

    pub async fn filtered_items(&self, query: &str, type_filter: TypeFilter) -> Vec<CatalogItem> {
        self.items.filtered(query, type_filter).await
    }

    pub async fn filtered_registry_results(
        &self,
        query: &str,
        type_filter: TypeFilter,
    ) -> Vec<RegistryEntry> {
        self.registry.filtered(query, type_filter).await
    }
}

/// Builder for CatalogLibrary with custom configuration
pub struct CatalogLibraryBuilder {
    backend: Option<Arc<dyn CatalogBackend>>,
    refresher: Option<Arc<dyn Refresher>>,
    config: LibraryConfig,
}

impl CatalogLibraryBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            backend: None,
            refresher: None,
            config: LibraryConfig::default(),
        }
    }

    /// Set the backend
    pub fn backend(mut self, backend: Arc<dyn CatalogBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set the downstream libraries refreshed after imports
    pub fn refresher(mut self, refresher: Arc<dyn Refresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    /// Set the engine configuration
    pub fn config(mut self, config: LibraryConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the library
    ///
    /// # Errors
    ///
    /// Returns an error if no backend was set.
    pub fn build(self) -> ServiceResult<CatalogLibrary> {
        let backend = self
            .backend
            .ok_or_else(|| ServiceError::Internal("Backend is required".to_string()))?;
        let refresher = self.refresher.unwrap_or_else(|| Arc::new(NoopRefresher));
        Ok(CatalogLibrary::assemble(backend, refresher, self.config))
    }
}

impl Default for CatalogLibraryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
