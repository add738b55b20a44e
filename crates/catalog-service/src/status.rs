//! Shared operation status: in-flight guards and error slots
//!
//! Every component reports failures through an [`ErrorSlot`] so the two
//! error policies live in one place:
//!
//! - [`ErrorSlot::capture`] for user-initiated operations: the message is
//!   recorded and the error is handed back to the caller.
//! - [`ErrorSlot::settle`] for passive background loads: the message is
//!   recorded and logged, and the caller gets `None` instead of an error.

use catalog_core::CatalogEvent;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

use crate::error::ServiceResult;
use crate::events::EventHub;

/// A per-class "operation in flight" flag
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    active: Arc<AtomicBool>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Claim the flag, or `None` if an operation of this class is already running
    pub fn try_begin(&self) -> Option<InFlightGuard> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard {
                active: Arc::clone(&self.active),
            })
    }
}

/// Releases its [`InFlight`] flag when dropped, on every exit path
#[derive(Debug)]
pub struct InFlightGuard {
    active: Arc<AtomicBool>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
    }
}

/// Last error message of a group of operations
#[derive(Debug, Clone)]
pub struct ErrorSlot {
    message: Arc<RwLock<Option<String>>>,
    events: EventHub,
}

impl ErrorSlot {
    pub fn new(events: EventHub) -> Self {
        Self {
            message: Arc::new(RwLock::new(None)),
            events,
        }
    }

    pub async fn get(&self) -> Option<String> {
        self.message.read().await.clone()
    }

    pub async fn clear(&self) {
        *self.message.write().await = None;
    }

    async fn record(&self, message: String) {
        *self.message.write().await = Some(message.clone());
        self.events.publish(CatalogEvent::ErrorRecorded { message });
    }

    /// Foreground policy: a success clears the slot, a failure is recorded
    /// and returned unchanged.
    pub async fn capture<T>(&self, result: ServiceResult<T>) -> ServiceResult<T> {
        match &result {
            Ok(_) => self.clear().await,
            Err(err) => self.record(err.to_string()).await,
        }
        result
    }

    /// Background policy: a failure is recorded, logged and swallowed. A
    /// success leaves the slot alone.
    pub async fn settle<T>(&self, operation: &'static str, result: ServiceResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(operation, error = %err, "Background operation failed");
                self.record(err.to_string()).await;
                None
            }
        }
    }
}
