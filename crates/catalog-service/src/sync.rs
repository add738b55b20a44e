//! Sync coordinator
//!
//! Drives sync passes. At most one pass runs at a time; a request made
//! while one is outstanding returns `Ok(None)` without reaching the
//! backend. The backend merges authoritatively, so after a pass the
//! affected items are reloaded rather than patched locally.

use catalog_backend::CatalogBackend;
use catalog_core::{CatalogEvent, RepoId, SyncOutcome};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::error::ServiceResult;
use crate::events::EventHub;
use crate::items::ItemStore;
use crate::repos::RepoCatalog;
use crate::status::{ErrorSlot, InFlight};

pub struct SyncCoordinator {
    backend: Arc<dyn CatalogBackend>,
    repos: Arc<RepoCatalog>,
    items: Arc<ItemStore>,
    syncing: InFlight,
    error: ErrorSlot,
    events: EventHub,
}

impl SyncCoordinator {
    pub fn new(
        backend: Arc<dyn CatalogBackend>,
        repos: Arc<RepoCatalog>,
        items: Arc<ItemStore>,
        error: ErrorSlot,
        events: EventHub,
    ) -> Self {
        Self {
            backend,
            repos,
            items,
            syncing: InFlight::new(),
            error,
            events,
        }
    }

    pub fn is_syncing(&self) -> bool {
        self.syncing.is_active()
    }

    /// Sync one repository.
    ///
    /// # Returns
    /// * `Ok(Some(outcome))` - The pass ran
    /// * `Ok(None)` - Another pass was already in flight
    /// * `Err(_)` - The pass failed; `last_synced_at` is unchanged
    #[instrument(skip(self), fields(repo_id = %repo_id))]
    pub async fn sync_one(&self, repo_id: &RepoId) -> ServiceResult<Option<SyncOutcome>> {
        let Some(_guard) = self.syncing.try_begin() else {
            debug!("Sync already in flight, skipping");
            return Ok(None);
        };

        debug!("Starting repository sync");
        self.events.publish(CatalogEvent::SyncStarted {
            repo_id: Some(*repo_id),
        });
        let result = self.run_one(repo_id).await;
        self.finish(Some(*repo_id), result).await
    }

    /// Sync every enabled repository in a single backend request
    #[instrument(skip(self))]
    pub async fn sync_all(&self) -> ServiceResult<Option<SyncOutcome>> {
        let Some(_guard) = self.syncing.try_begin() else {
            debug!("Sync already in flight, skipping");
            return Ok(None);
        };

        debug!("Starting sync of all enabled repositories");
        self.events.publish(CatalogEvent::SyncStarted { repo_id: None });
        let result = self.run_all().await;
        self.finish(None, result).await
    }

    async fn run_one(&self, repo_id: &RepoId) -> ServiceResult<SyncOutcome> {
        let outcome = self.backend.sync_repo(repo_id).await?;
        self.repos.mark_synced(Some(repo_id), Utc::now()).await;
        self.items.reload(Some(repo_id)).await?;
        Ok(outcome)
    }

    async fn run_all(&self) -> ServiceResult<SyncOutcome> {
        let outcome = self.backend.sync_all_repos().await?;
        self.repos.mark_synced(None, Utc::now()).await;
        self.items.reload(None).await?;
        Ok(outcome)
    }

    async fn finish(
        &self,
        repo_id: Option<RepoId>,
        result: ServiceResult<SyncOutcome>,
    ) -> ServiceResult<Option<SyncOutcome>> {
        if let Ok(outcome) = &result {
            info!(
                added = outcome.added,
                updated = outcome.updated,
                removed = outcome.removed,
                errors = outcome.errors.len(),
                "Sync finished"
            );
        }
        self.events.publish(CatalogEvent::SyncFinished {
            repo_id,
            outcome: result.as_ref().ok().cloned(),
        });
        self.error.capture(result).await.map(Some)
    }
}
