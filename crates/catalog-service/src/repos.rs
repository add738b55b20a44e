//! Repository catalog
//!
//! Tracks the source repositories and keeps their items consistent with
//! them: removing a repository purges its items from the [`ItemStore`]
//! before the call returns.

use catalog_backend::CatalogBackend;
use catalog_core::{CatalogEvent, RepoDescriptor, RepoId, SourceRepo};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::error::ServiceResult;
use crate::events::EventHub;
use crate::items::ItemStore;
use crate::status::{ErrorSlot, InFlight};

pub struct RepoCatalog {
    backend: Arc<dyn CatalogBackend>,
    items: Arc<ItemStore>,
    repos: RwLock<Vec<SourceRepo>>,
    loading: InFlight,
    error: ErrorSlot,
    events: EventHub,
}

impl RepoCatalog {
    pub fn new(
        backend: Arc<dyn CatalogBackend>,
        items: Arc<ItemStore>,
        error: ErrorSlot,
        events: EventHub,
    ) -> Self {
        Self {
            backend,
            items,
            repos: RwLock::new(Vec::new()),
            loading: InFlight::new(),
            error,
            events,
        }
    }

    /// Snapshot of the tracked repositories
    pub async fn repos(&self) -> Vec<SourceRepo> {
        self.repos.read().await.clone()
    }

    pub async fn get(&self, id: &RepoId) -> Option<SourceRepo> {
        self.repos.read().await.iter().find(|r| r.id == *id).cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_active()
    }

    /// Passive load of the repository list
    #[instrument(skip(self))]
    pub async fn load(&self) {
        let Some(_guard) = self.loading.try_begin() else {
            debug!("Repository load already in flight");
            return;
        };
        let result = self.refresh().await;
        self.error.settle("repos.load", result).await;
    }

    async fn refresh(&self) -> ServiceResult<()> {
        let fresh = self.backend.list_repos().await?;
        debug!(count = fresh.len(), "Repositories loaded");
        *self.repos.write().await = fresh;
        self.events.publish(CatalogEvent::ReposChanged);
        Ok(())
    }

    /// Add a repository
    ///
    /// Only the descriptor's shape is checked locally; whether the remote
    /// exists is decided by the backend.
    #[instrument(skip(self, descriptor), fields(repo = %descriptor.full_name()))]
    pub async fn add(&self, descriptor: RepoDescriptor) -> ServiceResult<SourceRepo> {
        debug!("Adding repository");
        let result = self.try_add(descriptor).await;
        self.error.capture(result).await
    }

    async fn try_add(&self, descriptor: RepoDescriptor) -> ServiceResult<SourceRepo> {
        descriptor.validate()?;
        let repo = self.backend.add_repo(descriptor).await?;
        self.repos.write().await.push(repo.clone());

        info!(repo_id = %repo.id, "Repository added");
        self.events.publish(CatalogEvent::ReposChanged);
        Ok(repo)
    }

    /// Remove a repository and every item discovered in it
    #[instrument(skip(self), fields(repo_id = %id))]
    pub async fn remove(&self, id: &RepoId) -> ServiceResult<()> {
        debug!("Removing repository");
        let result = self.try_remove(id).await;
        self.error.capture(result).await
    }

    async fn try_remove(&self, id: &RepoId) -> ServiceResult<()> {
        self.backend.remove_repo(id).await?;
        self.repos.write().await.retain(|r| r.id != *id);
        let purged = self.items.purge_repo(id).await;

        info!(purged, "Repository removed");
        self.events.publish(CatalogEvent::ReposChanged);
        Ok(())
    }

    /// Enable or disable a repository; items are left alone
    #[instrument(skip(self), fields(repo_id = %id))]
    pub async fn toggle(&self, id: &RepoId, enabled: bool) -> ServiceResult<()> {
        debug!("Toggling repository");
        let result = self.try_toggle(id, enabled).await;
        self.error.capture(result).await
    }

    async fn try_toggle(&self, id: &RepoId, enabled: bool) -> ServiceResult<()> {
        self.backend.toggle_repo(id, enabled).await?;
        if let Some(repo) = self.repos.write().await.iter_mut().find(|r| r.id == *id) {
            repo.enabled = enabled;
        }

        info!(enabled, "Repository toggled");
        self.events.publish(CatalogEvent::ReposChanged);
        Ok(())
    }

    /// Ask the backend for the starter repositories, then reload the list
    #[instrument(skip(self))]
    pub async fn seed_defaults(&self) -> ServiceResult<()> {
        let result: ServiceResult<()> = async {
            self.backend.seed_default_repos().await?;
            self.refresh().await
        }
        .await;
        self.error.capture(result).await
    }

    /// Stamp `last_synced_at` after a successful sync pass.
    ///
    /// `None` stamps every enabled repository.
    pub(crate) async fn mark_synced(&self, id: Option<&RepoId>, at: DateTime<Utc>) {
        let mut repos = self.repos.write().await;
        for repo in repos.iter_mut() {
            let hit = match id {
                Some(id) => repo.id == *id,
                None => repo.enabled,
            };
            if hit {
                repo.last_synced_at = Some(at);
            }
        }
        drop(repos);
        self.events.publish(CatalogEvent::ReposChanged);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use catalog_backend::{BackendError, InMemoryBackend, Operation, RemoteAsset};
    use catalog_core::AssetKind;

    struct Fixture {
        backend: Arc<InMemoryBackend>,
        items: Arc<ItemStore>,
        repos: RepoCatalog,
    }

    fn fixture() -> Fixture {
        let backend = Arc::new(InMemoryBackend::new());
        let events = EventHub::default();
        let error = ErrorSlot::new(events.clone());
        let items = Arc::new(ItemStore::new(backend.clone(), error.clone(), events.clone()));
        let repos = RepoCatalog::new(backend.clone(), items.clone(), error, events);
        Fixture { backend, items, repos }
    }

    #[tokio::test]
    async fn test_add_validates_shape_before_backend() {
        let f = fixture();
        let err = f.repos.add(RepoDescriptor::new("acme", "bad name")).await.unwrap_err();
        assert!(matches!(err, ServiceError::ValidationFailed(_)));
        assert_eq!(f.backend.call_count(Operation::AddRepo).await, 0);
        assert!(f.repos.error.get().await.is_some());
    }

    #[tokio::test]
    async fn test_add_duplicate_surfaces_backend_error() {
        let f = fixture();
        f.repos.add(RepoDescriptor::new("acme", "kit")).await.unwrap();
        let err = f.repos.add(RepoDescriptor::new("acme", "kit")).await.unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyExists(_)));
        assert_eq!(f.repos.repos().await.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_cascades_to_items() {
        let f = fixture();
        let a = f.repos.add(RepoDescriptor::new("acme", "a")).await.unwrap();
        let b = f.repos.add(RepoDescriptor::new("acme", "b")).await.unwrap();
        for name in ["acme/a", "acme/b"] {
            f.backend
                .stage_remote(name, vec![RemoteAsset::new("skills/x", "X", AssetKind::Skill)])
                .await;
        }
        f.backend.sync_all_repos().await.unwrap();
        f.items.load(None).await;

        f.repos.remove(&a.id).await.unwrap();

        assert!(f.items.items_for(&a.id).await.is_empty());
        assert_eq!(f.items.items_for(&b.id).await.len(), 1);
        assert!(f.repos.get(&a.id).await.is_none());
    }

    #[tokio::test]
    async fn test_failed_remove_keeps_state() {
        let f = fixture();
        let a = f.repos.add(RepoDescriptor::new("acme", "a")).await.unwrap();
        f.backend
            .fail_on(Operation::RemoveRepo, BackendError::Timeout("remove".to_string()))
            .await;

        assert!(f.repos.remove(&a.id).await.is_err());
        assert!(f.repos.get(&a.id).await.is_some());
    }

    #[tokio::test]
    async fn test_toggle_updates_flag_without_touching_items() {
        let f = fixture();
        let a = f.repos.add(RepoDescriptor::new("acme", "a")).await.unwrap();
        f.backend
            .stage_remote("acme/a", vec![RemoteAsset::new("skills/x", "X", AssetKind::Skill)])
            .await;
        f.backend.sync_repo(&a.id).await.unwrap();
        f.items.load(None).await;

        f.repos.toggle(&a.id, false).await.unwrap();

        assert!(!f.repos.get(&a.id).await.unwrap().enabled);
        assert_eq!(f.items.len().await, 1);
        assert_eq!(f.backend.call_count(Operation::SyncRepo).await, 1);
    }

    #[tokio::test]
    async fn test_seed_and_load() {
        let f = fixture();
        f.repos.seed_defaults().await.unwrap();
        let seeded = f.repos.repos().await.len();
        assert!(seeded > 0);

        f.repos.load().await;
        assert_eq!(f.repos.repos().await.len(), seeded);
    }
}
