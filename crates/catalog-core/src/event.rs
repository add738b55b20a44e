//! Change notifications for views that mirror catalog state
//!
//! Each component publishes one of these after it mutates a collection or
//! flag it owns, so consumers can re-read the affected field instead of
//! polling everything.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::asset::AssetKind;
use crate::sync::SyncOutcome;
use crate::types::{LocalAssetId, RepoId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CatalogEvent {
    /// The repository list or a repository's fields changed
    ReposChanged,

    /// Items changed for one repository, or for all when `repo_id` is absent
    ItemsChanged {
        #[serde(skip_serializing_if = "Option::is_none")]
        repo_id: Option<RepoId>,
    },

    /// A sync pass began; `repo_id` is absent for sync-all
    SyncStarted {
        #[serde(skip_serializing_if = "Option::is_none")]
        repo_id: Option<RepoId>,
    },

    /// A sync pass ended; `outcome` is absent when it failed
    SyncFinished {
        #[serde(skip_serializing_if = "Option::is_none")]
        repo_id: Option<RepoId>,
        #[serde(skip_serializing_if = "Option::is_none")]
        outcome: Option<SyncOutcome>,
    },

    /// Registry results, cursor or registry error changed
    RegistryResultsChanged,

    /// A local asset was created by an import
    AssetImported {
        asset_kind: AssetKind,
        asset_id: LocalAssetId,
    },

    /// A fresh rate-limit status was stored
    RateLimitUpdated,

    /// A background operation recorded an error
    ErrorRecorded { message: String },
}

impl CatalogEvent {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            CatalogEvent::ReposChanged => "repos_changed",
            CatalogEvent::ItemsChanged { .. } => "items_changed",
            CatalogEvent::SyncStarted { .. } => "sync_started",
            CatalogEvent::SyncFinished { .. } => "sync_finished",
            CatalogEvent::RegistryResultsChanged => "registry_results_changed",
            CatalogEvent::AssetImported { .. } => "asset_imported",
            CatalogEvent::RateLimitUpdated => "rate_limit_updated",
            CatalogEvent::ErrorRecorded { .. } => "error_recorded",
        }
    }
}

impl fmt::Display for CatalogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = CatalogEvent::ItemsChanged { repo_id: None };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json, serde_json::json!({"type": "items_changed"}));
    }

    #[test]
    fn test_event_names() {
        assert_eq!(CatalogEvent::ReposChanged.to_string(), "repos_changed");
        assert_eq!(
            CatalogEvent::SyncFinished { repo_id: None, outcome: None }.name(),
            "sync_finished"
        );
    }
}
