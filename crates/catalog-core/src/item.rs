//! Catalog items discovered by scanning source repositories

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::asset::AssetKind;
use crate::error::{CatalogError, Result};
use crate::types::{ItemId, LocalAssetId, RepoId};

/// A discovered candidate asset
///
/// `(repo_id, remote_locator)` identifies the item within the catalog; the
/// same locator may exist under several repositories as separate items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Unique identifier
    pub id: ItemId,

    /// Repository the item was discovered in
    pub repo_id: RepoId,

    /// Kind of asset the item imports as
    pub asset_kind: AssetKind,

    /// Display name
    pub name: String,

    /// Short description
    #[serde(default)]
    pub description: String,

    /// Path or URL of the item inside its repository
    pub remote_locator: String,

    /// Raw payload or reference as scanned from the remote
    #[serde(default)]
    pub payload: Value,

    /// Local asset created by importing this item
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imported_asset_id: Option<LocalAssetId>,

    /// Last time a sync pass created or refreshed this item
    pub updated_at: DateTime<Utc>,
}

impl CatalogItem {
    /// Create a not-yet-imported item
    pub fn new(
        repo_id: RepoId,
        asset_kind: AssetKind,
        name: impl Into<String>,
        remote_locator: impl Into<String>,
    ) -> Self {
        Self {
            id: ItemId::new(),
            repo_id,
            asset_kind,
            name: name.into(),
            description: String::new(),
            remote_locator: remote_locator.into(),
            payload: Value::Null,
            imported_asset_id: None,
            updated_at: Utc::now(),
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the raw payload
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// True iff a local asset exists for this item
    pub fn is_imported(&self) -> bool {
        self.imported_asset_id.is_some()
    }

    /// Record the local asset created for this item
    pub fn mark_imported(&mut self, asset_id: LocalAssetId) {
        self.imported_asset_id = Some(asset_id);
    }

    /// Whether this item and `other` occupy the same catalog slot
    pub fn same_slot(&self, other: &CatalogItem) -> bool {
        self.repo_id == other.repo_id && self.remote_locator == other.remote_locator
    }

    /// Validate the fields a sync pass relies on
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CatalogError::MissingField("name"));
        }
        if self.remote_locator.trim().is_empty() {
            return Err(CatalogError::MissingField("remote_locator"));
        }
        Ok(())
    }
}

impl fmt::Display for CatalogItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CatalogItem({}, {}, {})", self.id, self.name, self.asset_kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_state_follows_asset_id() {
        let mut item = CatalogItem::new(RepoId::new(), AssetKind::Skill, "pdf", "skills/pdf");
        assert!(!item.is_imported());

        let asset = LocalAssetId::new();
        item.mark_imported(asset);
        assert!(item.is_imported());
        assert_eq!(item.imported_asset_id, Some(asset));
    }

    #[test]
    fn test_same_slot() {
        let repo = RepoId::new();
        let a = CatalogItem::new(repo, AssetKind::Skill, "pdf", "skills/pdf");
        let b = CatalogItem::new(repo, AssetKind::Skill, "pdf v2", "skills/pdf");
        let c = CatalogItem::new(RepoId::new(), AssetKind::Skill, "pdf", "skills/pdf");
        assert!(a.same_slot(&b));
        assert!(!a.same_slot(&c));
    }

    #[test]
    fn test_validate_requires_name_and_locator() {
        let repo = RepoId::new();
        assert!(CatalogItem::new(repo, AssetKind::Hook, "fmt", "hooks/fmt.json").validate().is_ok());
        assert_eq!(
            CatalogItem::new(repo, AssetKind::Hook, " ", "hooks/fmt.json").validate().unwrap_err(),
            CatalogError::MissingField("name")
        );
        assert_eq!(
            CatalogItem::new(repo, AssetKind::Hook, "fmt", "").validate().unwrap_err(),
            CatalogError::MissingField("remote_locator")
        );
    }

    #[test]
    fn test_unimported_item_omits_asset_id_in_json() {
        let item = CatalogItem::new(RepoId::new(), AssetKind::Command, "deploy", "commands/deploy.md");
        let json = serde_json::to_value(&item).unwrap();
        assert!(json.get("imported_asset_id").is_none());
    }
}
