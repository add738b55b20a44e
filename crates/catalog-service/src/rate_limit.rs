//! Rate-limit monitor

use catalog_backend::CatalogBackend;
use catalog_core::{CatalogEvent, RateLimitStatus};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::error::ServiceResult;
use crate::events::EventHub;
use crate::status::ErrorSlot;

pub struct RateLimitMonitor {
    backend: Arc<dyn CatalogBackend>,
    status: RwLock<Option<RateLimitStatus>>,
    error: ErrorSlot,
    events: EventHub,
}

impl RateLimitMonitor {
    pub fn new(backend: Arc<dyn CatalogBackend>, error: ErrorSlot, events: EventHub) -> Self {
        Self {
            backend,
            status: RwLock::new(None),
            error,
            events,
        }
    }

    /// Last status fetched by [`check`](Self::check)
    pub async fn status(&self) -> Option<RateLimitStatus> {
        *self.status.read().await
    }

    /// Fetch and store the latest status. Never fails; a failed fetch keeps
    /// the previous status.
    #[instrument(skip(self))]
    pub async fn check(&self) {
        let result: ServiceResult<RateLimitStatus> =
            self.backend.get_rate_limit().await.map_err(Into::into);
        if let Some(status) = self.error.settle("rate_limit.check", result).await {
            self.store(status).await;
        }
    }

    /// Fetch and store the latest status, returning this fetch's own
    /// outcome rather than whatever the shared error slot holds
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> ServiceResult<RateLimitStatus> {
        let result: ServiceResult<RateLimitStatus> =
            self.backend.get_rate_limit().await.map_err(Into::into);
        let status = self.error.capture(result).await?;
        self.store(status).await;
        Ok(status)
    }

    async fn store(&self, status: RateLimitStatus) {
        debug!(remaining = status.remaining, limit = status.limit, "Rate limit refreshed");
        *self.status.write().await = Some(status);
        self.events.publish(CatalogEvent::RateLimitUpdated);
    }
}
