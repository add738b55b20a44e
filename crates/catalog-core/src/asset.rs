//! Asset kinds and the type filter used by list views

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CatalogError;

/// Kinds of automation assets a catalog item or registry entry can become
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    /// External tool/server connector
    Connector,
    /// Skill bundle
    Skill,
    /// Sub-agent definition
    SubAgent,
    /// Slash command
    Command,
    /// Lifecycle hook
    Hook,
}

impl AssetKind {
    /// Every kind, in display order
    pub const ALL: [AssetKind; 5] = [
        AssetKind::Connector,
        AssetKind::Skill,
        AssetKind::SubAgent,
        AssetKind::Command,
        AssetKind::Hook,
    ];

    /// Get the string representation of the asset kind
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Connector => "connector",
            AssetKind::Skill => "skill",
            AssetKind::SubAgent => "sub_agent",
            AssetKind::Command => "command",
            AssetKind::Hook => "hook",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetKind {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "connector" | "mcp" => Ok(AssetKind::Connector),
            "skill" => Ok(AssetKind::Skill),
            "sub_agent" | "subagent" | "agent" => Ok(AssetKind::SubAgent),
            "command" => Ok(AssetKind::Command),
            "hook" => Ok(AssetKind::Hook),
            _ => Err(CatalogError::InvalidAssetKind(s.to_string())),
        }
    }
}

/// Type gate applied by list views; `All` disables the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeFilter {
    #[default]
    All,
    Only(AssetKind),
}

impl TypeFilter {
    /// Sentinel string meaning "no type filter"
    pub const ALL_SENTINEL: &'static str = "all";

    /// Whether a value of `kind` passes the gate
    pub fn accepts(&self, kind: AssetKind) -> bool {
        match self {
            TypeFilter::All => true,
            TypeFilter::Only(wanted) => *wanted == kind,
        }
    }
}

impl From<AssetKind> for TypeFilter {
    fn from(kind: AssetKind) -> Self {
        TypeFilter::Only(kind)
    }
}

impl FromStr for TypeFilter {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(Self::ALL_SENTINEL) {
            return Ok(TypeFilter::All);
        }
        trimmed.parse().map(TypeFilter::Only)
    }
}

impl fmt::Display for TypeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeFilter::All => f.write_str(Self::ALL_SENTINEL),
            TypeFilter::Only(kind) => kind.fmt(f),
        }
    }
}
