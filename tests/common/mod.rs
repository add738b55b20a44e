//! Common test utilities and helpers
//!
//! This module provides the shared harness for integration tests: an
//! in-memory backend, a library wired to it, and a refresher that records
//! which downstream libraries were asked to reload.

#![allow(dead_code)]

use async_trait::async_trait;
use catalog_backend::{InMemoryBackend, InMemoryConfig, RemoteAsset};
use catalog_core::{CatalogItem, RepoDescriptor, SourceRepo, SyncOutcome};
use catalog_service::{CatalogLibrary, LibraryConfig, Refresher};
use std::sync::{Arc, Mutex};

pub mod fixtures;

/// Downstream refresh requests, in call order
#[derive(Debug, Default)]
pub struct RecordingRefresher {
    calls: Mutex<Vec<&'static str>>,
}

impl RecordingRefresher {
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, library: &'static str) {
        self.calls.lock().unwrap().push(library);
    }
}

#[async_trait]
impl Refresher for RecordingRefresher {
    async fn refresh_connectors(&self) {
        self.record("connectors");
    }

    async fn refresh_skills(&self) {
        self.record("skills");
    }

    async fn refresh_sub_agents(&self) {
        self.record("sub_agents");
    }
}

/// Test application state
pub struct TestCatalog {
    pub backend: Arc<InMemoryBackend>,
    pub library: CatalogLibrary,
    pub refresher: Arc<RecordingRefresher>,
}

impl TestCatalog {
    /// Create a catalog over an empty backend
    pub fn new() -> Self {
        Self::with_config(InMemoryConfig::default(), LibraryConfig::default())
    }

    pub fn with_config(backend_config: InMemoryConfig, config: LibraryConfig) -> Self {
        let backend = Arc::new(InMemoryBackend::with_config(backend_config));
        let refresher = Arc::new(RecordingRefresher::default());
        let library = CatalogLibrary::builder()
            .backend(backend.clone())
            .refresher(refresher.clone())
            .config(config)
            .build()
            .expect("Failed to build library");

        Self {
            backend,
            library,
            refresher,
        }
    }

    /// Track `owner/name` with the given remote contents
    pub async fn track(&self, locator: &str, remote: Vec<RemoteAsset>) -> SourceRepo {
        self.backend.stage_remote(locator, remote).await;
        self.library
            .repo_catalog()
            .add(RepoDescriptor::parse(locator).expect("Invalid locator"))
            .await
            .expect("Failed to add repository")
    }

    /// Sync one repository, failing the test on a skipped or failed pass
    pub async fn sync(&self, repo: &SourceRepo) -> SyncOutcome {
        self.library
            .sync()
            .sync_one(&repo.id)
            .await
            .expect("Sync failed")
            .expect("Sync skipped")
    }

    /// The local item named `name`
    pub async fn item(&self, name: &str) -> CatalogItem {
        self.library
            .items()
            .await
            .into_iter()
            .find(|i| i.name == name)
            .unwrap_or_else(|| panic!("no item named {}", name))
    }
}

impl Default for TestCatalog {
    fn default() -> Self {
        Self::new()
    }
}
