//! Core identifier types
//!
//! Locally minted identities wrap a ULID (Universally Unique Lexicographically
//! Sortable Identifier), so ordering by id is ordering by creation time.
//! Registry identities are opaque strings owned by the remote registry.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

use crate::error::CatalogError;

macro_rules! ulid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Ulid);

        impl $name {
            /// Generate a new identifier
            pub fn new() -> Self {
                Self(Ulid::new())
            }

            /// Create the identifier from a ULID
            pub fn from_ulid(ulid: Ulid) -> Self {
                Self(ulid)
            }

            /// Get the underlying ULID
            pub fn as_ulid(&self) -> &Ulid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = CatalogError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ulid::from_string(s.trim())
                    .map(Self)
                    .map_err(|e| CatalogError::InvalidId(format!("{}: {}", s, e)))
            }
        }
    };
}

ulid_id!(
    /// Identity of a tracked source repository
    RepoId
);

ulid_id!(
    /// Identity of a catalog item discovered in a source repository
    ItemId
);

ulid_id!(
    /// Identity of a first-class local asset created by an import
    LocalAssetId
);

/// Stable identity of a registry entry, used as the pagination dedup key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistryEntryId(String);

impl RegistryEntryId {
    /// Wrap a registry identity
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identity
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegistryEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RegistryEntryId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for RegistryEntryId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_generation() {
        let id1 = RepoId::new();
        let id2 = RepoId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_id_string_conversion() {
        let id = ItemId::new();
        let parsed: ItemId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_id_parse_rejects_garbage() {
        let err = "not-a-ulid".parse::<LocalAssetId>().unwrap_err();
        assert!(matches!(err, CatalogError::InvalidId(_)));
    }

    #[test]
    fn test_registry_entry_id_is_transparent() {
        let id = RegistryEntryId::from("io.github/filesystem");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"io.github/filesystem\"");
        assert_eq!(id.as_str(), "io.github/filesystem");
    }
}
