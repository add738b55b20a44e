//! Item store
//!
//! Holds the local mirror of every catalog item the backend knows about.
//! Items are never merged here: after a sync pass the affected slice is
//! reloaded wholesale from the backend, which performed the authoritative
//! merge.

use catalog_backend::CatalogBackend;
use catalog_core::{
    filter_view, CatalogEvent, CatalogItem, ItemId, LocalAssetId, RepoId, TypeFilter,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::error::ServiceResult;
use crate::events::EventHub;
use crate::status::{ErrorSlot, InFlight};

pub struct ItemStore {
    backend: Arc<dyn CatalogBackend>,
    items: RwLock<Vec<CatalogItem>>,
    loading: InFlight,
    error: ErrorSlot,
    events: EventHub,
}

impl ItemStore {
    pub fn new(backend: Arc<dyn CatalogBackend>, error: ErrorSlot, events: EventHub) -> Self {
        Self {
            backend,
            items: RwLock::new(Vec::new()),
            loading: InFlight::new(),
            error,
            events,
        }
    }

    /// Snapshot of every item
    pub async fn items(&self) -> Vec<CatalogItem> {
        self.items.read().await.clone()
    }

    /// Items belonging to one repository
    pub async fn items_for(&self, repo_id: &RepoId) -> Vec<CatalogItem> {
        self.items
            .read()
            .await
            .iter()
            .filter(|item| item.repo_id == *repo_id)
            .cloned()
            .collect()
    }

    pub async fn get(&self, id: &ItemId) -> Option<CatalogItem> {
        self.items.read().await.iter().find(|item| item.id == *id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_active()
    }

    /// Items matching `query` and `type_filter`, in store order
    pub async fn filtered(&self, query: &str, type_filter: TypeFilter) -> Vec<CatalogItem> {
        let items = self.items.read().await;
        filter_view(&items, query, type_filter)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Passive load: failures are recorded and logged, never returned.
    ///
    /// A load issued while another is running is skipped.
    #[instrument(skip(self))]
    pub async fn load(&self, repo_id: Option<RepoId>) {
        let Some(_guard) = self.loading.try_begin() else {
            debug!("Item load already in flight");
            return;
        };
        let result = self.reload(repo_id.as_ref()).await;
        self.error.settle("items.load", result).await;
    }

    /// Replace the items of `repo_id` (or every item when `None`) with the
    /// backend's current view.
    pub(crate) async fn reload(&self, repo_id: Option<&RepoId>) -> ServiceResult<()> {
        let fresh = self.backend.list_items(repo_id).await?;
        let mut items = self.items.write().await;
        match repo_id {
            Some(id) => {
                items.retain(|item| item.repo_id != *id);
                items.extend(fresh);
            }
            None => *items = fresh,
        }
        debug!(count = items.len(), "Items reloaded");
        drop(items);

        self.events.publish(CatalogEvent::ItemsChanged {
            repo_id: repo_id.copied(),
        });
        Ok(())
    }

    /// Drop every item of a removed repository
    pub(crate) async fn purge_repo(&self, repo_id: &RepoId) -> usize {
        let mut items = self.items.write().await;
        let before = items.len();
        items.retain(|item| item.repo_id != *repo_id);
        let purged = before - items.len();
        drop(items);

        if purged > 0 {
            info!(repo_id = %repo_id, purged, "Purged items of removed repository");
        }
        self.events.publish(CatalogEvent::ItemsChanged {
            repo_id: Some(*repo_id),
        });
        purged
    }

    /// Point exactly one item at its new local asset
    pub(crate) async fn mark_imported(&self, id: &ItemId, asset_id: LocalAssetId) -> bool {
        let mut items = self.items.write().await;
        let Some(item) = items.iter_mut().find(|item| item.id == *id) else {
            return false;
        };
        item.mark_imported(asset_id);
        let repo_id = item.repo_id;
        drop(items);

        self.events.publish(CatalogEvent::ItemsChanged {
            repo_id: Some(repo_id),
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_backend::{BackendError, InMemoryBackend, Operation, RemoteAsset};
    use catalog_core::{AssetKind, RepoDescriptor};

    async fn store_with_items() -> (Arc<InMemoryBackend>, ItemStore, RepoId, RepoId) {
        let backend = Arc::new(InMemoryBackend::new());
        let a = backend.add_repo(RepoDescriptor::new("acme", "a")).await.unwrap();
        let b = backend.add_repo(RepoDescriptor::new("acme", "b")).await.unwrap();
        backend
            .stage_remote(
                "acme/a",
                vec![
                    RemoteAsset::new("skills/pdf", "PDF", AssetKind::Skill),
                    RemoteAsset::new("agents/review.md", "Reviewer", AssetKind::SubAgent),
                ],
            )
            .await;
        backend
            .stage_remote("acme/b", vec![RemoteAsset::new("skills/pdf", "PDF", AssetKind::Skill)])
            .await;
        backend.sync_all_repos().await.unwrap();

        let events = EventHub::default();
        let store = ItemStore::new(backend.clone(), ErrorSlot::new(events.clone()), events);
        (backend, store, a.id, b.id)
    }

    #[tokio::test]
    async fn test_load_all_and_filter() {
        let (_backend, store, _, _) = store_with_items().await;
        store.load(None).await;

        assert_eq!(store.len().await, 3);
        let skills = store.filtered("", TypeFilter::Only(AssetKind::Skill)).await;
        assert_eq!(skills.len(), 2);
        let reviewers = store.filtered("REVIEW", TypeFilter::All).await;
        assert_eq!(reviewers.len(), 1);
    }

    #[tokio::test]
    async fn test_reload_one_repo_keeps_others() {
        let (backend, store, a, b) = store_with_items().await;
        store.load(None).await;

        backend.stage_remote("acme/a", Vec::new()).await;
        backend.sync_repo(&a).await.unwrap();
        store.reload(Some(&a)).await.unwrap();

        assert!(store.items_for(&a).await.is_empty());
        assert_eq!(store.items_for(&b).await.len(), 1);
    }

    #[tokio::test]
    async fn test_load_failure_is_settled() {
        let (backend, store, _, _) = store_with_items().await;
        backend
            .fail_on(Operation::ListItems, BackendError::Transport("offline".to_string()))
            .await;

        store.load(None).await;
        assert!(store.is_empty().await);
        assert!(store.error.get().await.is_some());
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_purge_and_mark_imported_touch_only_their_target() {
        let (_backend, store, a, b) = store_with_items().await;
        store.load(None).await;

        let twin_in_b = store.items_for(&b).await.remove(0);
        let pdf_in_a = store
            .items_for(&a)
            .await
            .into_iter()
            .find(|i| i.name == twin_in_b.name)
            .unwrap();

        assert!(store.mark_imported(&pdf_in_a.id, LocalAssetId::new()).await);
        assert!(store.get(&pdf_in_a.id).await.unwrap().is_imported());
        assert!(!store.get(&twin_in_b.id).await.unwrap().is_imported());

        assert_eq!(store.purge_repo(&a).await, 2);
        assert_eq!(store.len().await, 1);
        assert!(!store.mark_imported(&pdf_in_a.id, LocalAssetId::new()).await);
    }
}
