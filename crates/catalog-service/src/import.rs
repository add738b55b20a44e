//! Import reconciler
//!
//! Turns a catalog item or a registry entry into a local asset, then asks
//! the matching downstream library to refresh itself.

use async_trait::async_trait;
use catalog_backend::CatalogBackend;
use catalog_core::{AssetKind, CatalogEvent, ImportedAsset, ItemId, RegistryEntry};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::error::{ServiceError, ServiceResult};
use crate::events::EventHub;
use crate::items::ItemStore;
use crate::status::ErrorSlot;

/// Downstream asset libraries that must reload after an import
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Refresher: Send + Sync {
    async fn refresh_connectors(&self);
    async fn refresh_skills(&self);
    async fn refresh_sub_agents(&self);
}

/// Refresher for hosts without downstream libraries
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRefresher;

#[async_trait]
impl Refresher for NoopRefresher {
    async fn refresh_connectors(&self) {}
    async fn refresh_skills(&self) {}
    async fn refresh_sub_agents(&self) {}
}

/// What to import
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportTarget {
    /// A discovered catalog item, by identity
    Item(ItemId),
    /// A registry search result
    Entry(RegistryEntry),
}

pub struct ImportReconciler {
    backend: Arc<dyn CatalogBackend>,
    items: Arc<ItemStore>,
    refresher: Arc<dyn Refresher>,
    error: ErrorSlot,
    events: EventHub,
}

impl ImportReconciler {
    pub fn new(
        backend: Arc<dyn CatalogBackend>,
        items: Arc<ItemStore>,
        refresher: Arc<dyn Refresher>,
        error: ErrorSlot,
        events: EventHub,
    ) -> Self {
        Self {
            backend,
            items,
            refresher,
            error,
            events,
        }
    }

    /// Import a catalog item or registry entry as a local asset
    #[instrument(skip(self, target))]
    pub async fn import(&self, target: ImportTarget) -> ServiceResult<ImportedAsset> {
        let result = match &target {
            ImportTarget::Item(id) => self.import_catalog_item(id).await,
            ImportTarget::Entry(entry) => self.import_registry_entry(entry).await,
        };
        let imported = self.error.capture(result).await?;

        info!(
            asset_kind = %imported.asset_kind,
            asset_id = %imported.asset_id,
            "Asset imported"
        );
        self.events.publish(CatalogEvent::AssetImported {
            asset_kind: imported.asset_kind,
            asset_id: imported.asset_id,
        });
        self.refresh_downstream(imported.asset_kind).await;
        Ok(imported)
    }

    pub async fn import_item(&self, id: &ItemId) -> ServiceResult<ImportedAsset> {
        self.import(ImportTarget::Item(*id)).await
    }

    pub async fn import_entry(&self, entry: &RegistryEntry) -> ServiceResult<ImportedAsset> {
        self.import(ImportTarget::Entry(entry.clone())).await
    }

    async fn import_catalog_item(&self, id: &ItemId) -> ServiceResult<ImportedAsset> {
        let item = self
            .items
            .get(id)
            .await
            .ok_or_else(|| ServiceError::NotFound(format!("catalog item {}", id)))?;
        if item.is_imported() {
            return Err(ServiceError::AlreadyImported(item.name));
        }

        debug!(item = %item.name, "Importing catalog item");
        let response = self.backend.import_item(id).await.map_err(|err| {
            if err.is_already_exists() {
                ServiceError::AlreadyImported(item.name.clone())
            } else {
                err.into()
            }
        })?;
        if !response.success {
            return Err(ServiceError::ImportRejected(format!(
                "backend did not create an asset for {}",
                item.name
            )));
        }

        self.items.mark_imported(id, response.asset_id).await;
        Ok(ImportedAsset {
            asset_kind: response.asset_kind,
            asset_id: response.asset_id,
        })
    }

    async fn import_registry_entry(&self, entry: &RegistryEntry) -> ServiceResult<ImportedAsset> {
        debug!(entry = %entry.id, "Importing registry entry");
        let asset_id = self.backend.import_registry_entry(entry).await?;
        Ok(ImportedAsset {
            asset_kind: entry.asset_kind,
            asset_id,
        })
    }

    async fn refresh_downstream(&self, kind: AssetKind) {
        match kind {
            AssetKind::Connector => self.refresher.refresh_connectors().await,
            AssetKind::Skill => self.refresher.refresh_skills().await,
            AssetKind::SubAgent => self.refresher.refresh_sub_agents().await,
            AssetKind::Command | AssetKind::Hook => {
                debug!(%kind, "No downstream library to refresh");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use catalog_backend::{
        BackendError, BackendResult, ImportResult, InMemoryBackend, Operation, RemoteAsset,
    };
    use catalog_core::{
        CatalogItem, ConnectionSpec, LocalAssetId, RateLimitStatus, RegistryPage, RepoDescriptor,
        RepoId, SourceRepo, SyncOutcome,
    };

    struct Fixture {
        backend: Arc<InMemoryBackend>,
        items: Arc<ItemStore>,
        error: ErrorSlot,
        events: EventHub,
    }

    impl Fixture {
        async fn new() -> Self {
            let backend = Arc::new(InMemoryBackend::new());
            let repo = backend.add_repo(RepoDescriptor::new("acme", "kit")).await.unwrap();
            let twin = backend.add_repo(RepoDescriptor::new("acme", "fork")).await.unwrap();
            let assets = vec![
                RemoteAsset::new("skills/pdf", "PDF", AssetKind::Skill),
                RemoteAsset::new("agents/review.md", "Reviewer", AssetKind::SubAgent),
                RemoteAsset::new("commands/ship.md", "ship", AssetKind::Command),
            ];
            backend.stage_remote("acme/kit", assets.clone()).await;
            backend.stage_remote("acme/fork", assets).await;
            backend.sync_repo(&repo.id).await.unwrap();
            backend.sync_repo(&twin.id).await.unwrap();

            let events = EventHub::default();
            let error = ErrorSlot::new(events.clone());
            let items = Arc::new(ItemStore::new(backend.clone(), error.clone(), events.clone()));
            items.load(None).await;
            Self {
                backend,
                items,
                error,
                events,
            }
        }

        fn reconciler(&self, refresher: MockRefresher) -> ImportReconciler {
            ImportReconciler::new(
                self.backend.clone(),
                self.items.clone(),
                Arc::new(refresher),
                self.error.clone(),
                self.events.clone(),
            )
        }

        async fn item(&self, name: &str) -> CatalogItem {
            self.items
                .items()
                .await
                .into_iter()
                .find(|i| i.name == name)
                .unwrap()
        }
    }

    #[tokio::test]
    async fn test_import_item_marks_only_that_item_and_refreshes_skills() {
        let f = Fixture::new().await;
        let mut refresher = MockRefresher::new();
        refresher.expect_refresh_skills().times(1).returning(|| ());
        refresher.expect_refresh_connectors().never();
        refresher.expect_refresh_sub_agents().never();
        let reconciler = f.reconciler(refresher);

        let pdf = f.item("PDF").await;
        let imported = reconciler.import_item(&pdf.id).await.unwrap();
        assert_eq!(imported.asset_kind, AssetKind::Skill);

        let pdfs: Vec<CatalogItem> = f
            .items
            .items()
            .await
            .into_iter()
            .filter(|i| i.name == "PDF")
            .collect();
        assert_eq!(pdfs.len(), 2);
        for item in pdfs {
            if item.id == pdf.id {
                assert_eq!(item.imported_asset_id, Some(imported.asset_id));
            } else {
                assert!(!item.is_imported());
            }
        }
    }

    #[tokio::test]
    async fn test_second_import_is_rejected_without_backend_call() {
        let f = Fixture::new().await;
        let mut refresher = MockRefresher::new();
        refresher.expect_refresh_sub_agents().times(1).returning(|| ());
        let reconciler = f.reconciler(refresher);

        let reviewer = f.item("Reviewer").await;
        reconciler.import_item(&reviewer.id).await.unwrap();
        let err = reconciler.import_item(&reviewer.id).await.unwrap_err();

        assert!(matches!(err, ServiceError::AlreadyImported(_)));
        assert_eq!(f.backend.call_count(Operation::ImportItem).await, 1);
    }

    #[tokio::test]
    async fn test_command_import_refreshes_nothing() {
        let f = Fixture::new().await;
        let mut refresher = MockRefresher::new();
        refresher.expect_refresh_connectors().never();
        refresher.expect_refresh_skills().never();
        refresher.expect_refresh_sub_agents().never();
        let reconciler = f.reconciler(refresher);

        let ship = f.item("ship").await;
        let imported = reconciler.import_item(&ship.id).await.unwrap();
        assert_eq!(imported.asset_kind, AssetKind::Command);
    }

    #[tokio::test]
    async fn test_failed_import_leaves_item_untouched() {
        let f = Fixture::new().await;
        f.backend
            .fail_on(Operation::ImportItem, BackendError::Transport("reset".to_string()))
            .await;
        let mut refresher = MockRefresher::new();
        refresher.expect_refresh_skills().never();
        let reconciler = f.reconciler(refresher);

        let pdf = f.item("PDF").await;
        assert!(reconciler.import_item(&pdf.id).await.is_err());
        assert!(!f.items.get(&pdf.id).await.unwrap().is_imported());
        assert!(f.error.get().await.is_some());
    }

    #[tokio::test]
    async fn test_unknown_item_is_not_found() {
        let f = Fixture::new().await;
        let reconciler = f.reconciler(MockRefresher::new());
        let err = reconciler.import_item(&ItemId::new()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_registry_entry_import_refreshes_connectors() {
        let f = Fixture::new().await;
        let mut refresher = MockRefresher::new();
        refresher.expect_refresh_connectors().times(1).returning(|| ());
        let reconciler = f.reconciler(refresher);

        let entry = RegistryEntry::new("gh", "github", ConnectionSpec::stdio("npx"));
        let imported = reconciler.import_entry(&entry).await.unwrap();
        assert_eq!(imported.asset_kind, AssetKind::Connector);
        assert_eq!(f.backend.local_assets().await.len(), 1);
    }

    /// Backend that answers imports with `success: false`
    struct RefusingBackend(InMemoryBackend);

    #[async_trait]
    impl CatalogBackend for RefusingBackend {
        async fn list_repos(&self) -> BackendResult<Vec<SourceRepo>> {
            self.0.list_repos().await
        }
        async fn add_repo(&self, descriptor: RepoDescriptor) -> BackendResult<SourceRepo> {
            self.0.add_repo(descriptor).await
        }
        async fn remove_repo(&self, id: &RepoId) -> BackendResult<()> {
            self.0.remove_repo(id).await
        }
        async fn toggle_repo(&self, id: &RepoId, enabled: bool) -> BackendResult<()> {
            self.0.toggle_repo(id, enabled).await
        }
        async fn list_items(&self, repo_id: Option<&RepoId>) -> BackendResult<Vec<CatalogItem>> {
            self.0.list_items(repo_id).await
        }
        async fn sync_repo(&self, id: &RepoId) -> BackendResult<SyncOutcome> {
            self.0.sync_repo(id).await
        }
        async fn sync_all_repos(&self) -> BackendResult<SyncOutcome> {
            self.0.sync_all_repos().await
        }
        async fn import_item(&self, _item_id: &ItemId) -> BackendResult<ImportResult> {
            Ok(ImportResult {
                success: false,
                asset_kind: AssetKind::Skill,
                asset_id: LocalAssetId::new(),
            })
        }
        async fn search_registry(&self, query: &str, limit: usize) -> BackendResult<Vec<RegistryEntry>> {
            self.0.search_registry(query, limit).await
        }
        async fn list_registry(&self, cursor: Option<&str>) -> BackendResult<RegistryPage> {
            self.0.list_registry(cursor).await
        }
        async fn import_registry_entry(&self, entry: &RegistryEntry) -> BackendResult<LocalAssetId> {
            self.0.import_registry_entry(entry).await
        }
        async fn get_rate_limit(&self) -> BackendResult<RateLimitStatus> {
            self.0.get_rate_limit().await
        }
        async fn seed_default_repos(&self) -> BackendResult<()> {
            self.0.seed_default_repos().await
        }
    }

    #[tokio::test]
    async fn test_unsuccessful_response_is_import_rejected() {
        let inner = InMemoryBackend::new();
        let repo = inner.add_repo(RepoDescriptor::new("acme", "kit")).await.unwrap();
        inner
            .stage_remote("acme/kit", vec![RemoteAsset::new("skills/pdf", "PDF", AssetKind::Skill)])
            .await;
        inner.sync_repo(&repo.id).await.unwrap();

        let backend: Arc<dyn CatalogBackend> = Arc::new(RefusingBackend(inner));
        let events = EventHub::default();
        let error = ErrorSlot::new(events.clone());
        let items = Arc::new(ItemStore::new(backend.clone(), error.clone(), events.clone()));
        items.load(None).await;
        let reconciler = ImportReconciler::new(
            backend,
            items.clone(),
            Arc::new(NoopRefresher),
            error,
            events,
        );

        let item = items.items().await.remove(0);
        let err = reconciler.import_item(&item.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::ImportRejected(_)));
        assert!(!items.get(&item.id).await.unwrap().is_imported());
    }
}
