//! Change notification fan-out

use catalog_core::CatalogEvent;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

/// Default buffered events per subscriber
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventConfig {
    /// Events buffered per subscriber before slow receivers start lagging
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

fn default_capacity() -> usize {
    DEFAULT_EVENT_CAPACITY
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// Broadcasts catalog events to every subscriber
///
/// Publishing never blocks and never fails; events sent while nobody is
/// subscribed are dropped.
#[derive(Debug, Clone)]
pub struct EventHub {
    sender: broadcast::Sender<CatalogEvent>,
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: CatalogEvent) {
        trace!(event = event.name(), "Publishing catalog event");
        if self.sender.send(event).is_err() {
            trace!("No subscribers for catalog event");
        }
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
