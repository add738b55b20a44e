//! Registry entries returned by the paginated search registry
//!
//! Entries are never persisted locally; they live in the pager's in-memory
//! result set until imported.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::asset::AssetKind;
use crate::error::{CatalogError, Result};
use crate::types::{LocalAssetId, RegistryEntryId};

/// How a connector published in the registry is reached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConnectionSpec {
    /// Local process speaking over stdio
    Stdio {
        command: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<String>,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        env: BTreeMap<String, String>,
    },
    /// Remote endpoint
    Remote {
        url: String,
        #[serde(default = "default_transport")]
        transport: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        headers: BTreeMap<String, String>,
    },
}

fn default_transport() -> String {
    "http".to_string()
}

impl ConnectionSpec {
    /// Stdio connection with no arguments
    pub fn stdio(command: impl Into<String>) -> Self {
        ConnectionSpec::Stdio {
            command: command.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
        }
    }

    /// Remote connection over the default transport
    pub fn remote(url: impl Into<String>) -> Self {
        ConnectionSpec::Remote {
            url: url.into(),
            transport: default_transport(),
            headers: BTreeMap::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            ConnectionSpec::Stdio { command, .. } if command.trim().is_empty() => {
                Err(CatalogError::MissingField("command"))
            }
            ConnectionSpec::Remote { url, .. } => {
                url::Url::parse(url)
                    .map(|_| ())
                    .map_err(|e| CatalogError::invalid("url", e.to_string()))
            }
            _ => Ok(()),
        }
    }
}

/// A candidate asset from the search registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// Stable registry identity
    pub id: RegistryEntryId,

    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default = "default_entry_kind")]
    pub asset_kind: AssetKind,

    pub connection: ConnectionSpec,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

fn default_entry_kind() -> AssetKind {
    AssetKind::Connector
}

impl RegistryEntry {
    /// Create a connector entry
    pub fn new(
        id: impl Into<RegistryEntryId>,
        name: impl Into<String>,
        connection: ConnectionSpec,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            asset_kind: default_entry_kind(),
            connection,
            homepage: None,
            version: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_homepage(mut self, homepage: impl Into<String>) -> Self {
        self.homepage = Some(homepage.into());
        self
    }
}

impl fmt::Display for RegistryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RegistryEntry({}, {})", self.id, self.name)
    }
}

/// One page of a registry listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryPage {
    pub entries: Vec<RegistryEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

impl RegistryPage {
    pub fn new(entries: Vec<RegistryEntry>, next_cursor: Option<String>) -> Self {
        Self {
            entries,
            next_cursor,
        }
    }

    /// Whether the source advertises another page
    pub fn has_more(&self) -> bool {
        self.next_cursor.is_some()
    }
}

/// A first-class local asset created by an import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedAsset {
    pub asset_kind: AssetKind,
    pub asset_id: LocalAssetId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_kind_defaults_to_connector() {
        let json = r#"{
            "id": "io.example/fs",
            "name": "filesystem",
            "connection": {"type": "stdio", "command": "npx"}
        }"#;
        let entry: RegistryEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.asset_kind, AssetKind::Connector);
        assert_eq!(entry.connection, ConnectionSpec::stdio("npx"));
        assert!(entry.description.is_empty());
    }

    #[test]
    fn test_remote_transport_default() {
        let json = r#"{"type": "remote", "url": "https://mcp.example.com/sse"}"#;
        let spec: ConnectionSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec, ConnectionSpec::remote("https://mcp.example.com/sse"));
    }

    #[test]
    fn test_connection_validation() {
        assert!(ConnectionSpec::stdio("uvx").validate().is_ok());
        assert!(ConnectionSpec::stdio("  ").validate().is_err());
        assert!(ConnectionSpec::remote("not a url").validate().is_err());
        assert!(ConnectionSpec::remote("https://example.com/mcp").validate().is_ok());
    }

    #[test]
    fn test_page_has_more() {
        assert!(!RegistryPage::default().has_more());
        assert!(RegistryPage::new(vec![], Some("c1".into())).has_more());
    }
}
