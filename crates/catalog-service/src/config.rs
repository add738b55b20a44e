//! Engine configuration
//!
//! The part of the application configuration the service layer consumes.
//! Every field has a default, so an empty document is a valid config.

use serde::{Deserialize, Serialize};

use crate::events::EventConfig;
use crate::pager::PagerConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Registry search and paging
    #[serde(default)]
    pub registry: PagerConfig,

    /// Change notification fan-out
    #[serde(default)]
    pub events: EventConfig,
}

impl LibraryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(mut self, registry: PagerConfig) -> Self {
        self.registry = registry;
        self
    }

    pub fn events(mut self, events: EventConfig) -> Self {
        self.events = events;
        self
    }
}
