//! Source repositories and the descriptors used to add them
//!
//! A source repository is an enumerable remote location (an `owner/name`
//! pair on the hosting service) whose contents are periodically re-scanned
//! into catalog items.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use url::Url;

use crate::asset::AssetKind;
use crate::error::{CatalogError, Result};
use crate::types::RepoId;

/// Hosting service that bare `owner/name` locators refer to
pub const DEFAULT_HOST: &str = "github.com";

/// How a repository declares its assets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepoLayout {
    /// One file (or directory) per asset
    #[default]
    FileEnumerated,
    /// Assets listed as links in the repository README
    ReadmeEnumerated,
}

impl RepoLayout {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepoLayout::FileEnumerated => "file_enumerated",
            RepoLayout::ReadmeEnumerated => "readme_enumerated",
        }
    }
}

impl fmt::Display for RepoLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RepoLayout {
    type Err = CatalogError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "file_enumerated" | "files" | "file" => Ok(RepoLayout::FileEnumerated),
            "readme_enumerated" | "readme" => Ok(RepoLayout::ReadmeEnumerated),
            _ => Err(CatalogError::InvalidLayout(s.to_string())),
        }
    }
}

/// Which asset kinds a repository is declared to contain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// Only assets of one kind
    Single(AssetKind),
    /// Any kind
    #[default]
    Mixed,
}

impl ContentKind {
    /// Whether an asset of `kind` may come from a repository with this content kind
    pub fn allows(&self, kind: AssetKind) -> bool {
        match self {
            ContentKind::Single(declared) => *declared == kind,
            ContentKind::Mixed => true,
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKind::Single(kind) => kind.fmt(f),
            ContentKind::Mixed => f.write_str("mixed"),
        }
    }
}

impl FromStr for ContentKind {
    type Err = CatalogError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("mixed") {
            return Ok(ContentKind::Mixed);
        }
        s.parse().map(ContentKind::Single)
    }
}

/// A tracked source repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRepo {
    /// Unique identifier
    pub id: RepoId,

    /// Owning account on the hosting service
    pub owner: String,

    /// Repository name
    pub name: String,

    /// Declared layout
    pub layout: RepoLayout,

    /// Declared content kind
    pub content_kind: ContentKind,

    /// Disabled repositories are skipped by sync-all but keep their items
    pub enabled: bool,

    /// Set only after a successful sync pass
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<DateTime<Utc>>,

    /// Change-detection token from the last sync
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    /// Timestamp when the repository was added
    pub created_at: DateTime<Utc>,
}

impl SourceRepo {
    /// Create a never-synced repository from a validated descriptor
    pub fn from_descriptor(descriptor: &RepoDescriptor) -> Result<Self> {
        descriptor.validate()?;
        Ok(Self {
            id: RepoId::new(),
            owner: descriptor.owner.trim().to_string(),
            name: descriptor.name.trim().to_string(),
            layout: descriptor.layout,
            content_kind: descriptor.content_kind,
            enabled: descriptor.enabled,
            last_synced_at: None,
            etag: None,
            created_at: Utc::now(),
        })
    }

    /// `owner/name`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// Whether this repository refers to the same remote as `descriptor`
    pub fn matches(&self, descriptor: &RepoDescriptor) -> bool {
        self.owner.eq_ignore_ascii_case(descriptor.owner.trim())
            && self.name.eq_ignore_ascii_case(descriptor.name.trim())
    }

    /// Whether the repository has completed at least one sync
    pub fn is_synced(&self) -> bool {
        self.last_synced_at.is_some()
    }
}

impl fmt::Display for SourceRepo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceRepo({}, {}, {})", self.id, self.full_name(), self.content_kind)
    }
}

fn segment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.-]+$").expect("static pattern compiles"))
}

fn validate_segment(field: &'static str, value: &str) -> Result<()> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CatalogError::MissingField(field));
    }
    if value == "." || value == ".." {
        return Err(CatalogError::invalid(field, "must not be a path component"));
    }
    if !segment_pattern().is_match(value) {
        return Err(CatalogError::invalid(
            field,
            format!("'{}' may only contain letters, digits, '-', '_' and '.'", value),
        ));
    }
    Ok(())
}

/// Input for adding a source repository
///
/// Only the shape is checked here; whether the remote exists is the
/// backend's call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoDescriptor {
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub layout: RepoLayout,
    #[serde(default)]
    pub content_kind: ContentKind,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl RepoDescriptor {
    /// Create a descriptor with default layout and mixed content
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            layout: RepoLayout::default(),
            content_kind: ContentKind::default(),
            enabled: true,
        }
    }

    /// Parse a descriptor out of a user-pasted locator.
    ///
    /// Accepts `owner/name`, `https://github.com/owner/name(.git)`, browser
    /// URLs such as `https://github.com/owner/name/tree/main/skills`, and the
    /// scp form `git@github.com:owner/name.git`.
    pub fn parse(locator: &str) -> Result<Self> {
        let (owner, name) = parse_locator(locator)?;
        let descriptor = Self::new(owner, name);
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Set the layout
    pub fn layout(mut self, layout: RepoLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Set the content kind
    pub fn content_kind(mut self, content_kind: ContentKind) -> Self {
        self.content_kind = content_kind;
        self
    }

    /// Set the initial enabled flag
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Validate the descriptor shape
    pub fn validate(&self) -> Result<()> {
        validate_segment("owner", &self.owner)?;
        validate_segment("name", &self.name)?;
        Ok(())
    }

    /// `owner/name`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner.trim(), self.name.trim())
    }
}

fn split_owner_name(host: &str, path: &str, raw: &str) -> Result<(String, String)> {
    if !host.eq_ignore_ascii_case(DEFAULT_HOST) && !host.ends_with(".github.com") {
        return Err(CatalogError::InvalidLocator(format!(
            "unsupported host '{}' in '{}'",
            host, raw
        )));
    }

    let mut segments = path.split('/').filter(|s| !s.is_empty());
    let owner = segments.next();
    let name = segments.next();
    match (owner, name) {
        (Some(owner), Some(name)) => {
            let name = name.strip_suffix(".git").unwrap_or(name);
            Ok((owner.to_string(), name.to_string()))
        }
        _ => Err(CatalogError::InvalidLocator(format!(
            "expected owner/name in '{}'",
            raw
        ))),
    }
}

fn parse_locator(input: &str) -> Result<(String, String)> {
    let raw = input.trim();
    if raw.is_empty() {
        return Err(CatalogError::MissingField("locator"));
    }

    if let Some(rest) = raw.strip_prefix("git@") {
        let (host, path) = rest
            .split_once(':')
            .ok_or_else(|| CatalogError::InvalidLocator(raw.to_string()))?;
        return split_owner_name(host.trim(), path.trim(), raw);
    }

    if raw.contains("://") {
        let url = Url::parse(raw).map_err(|e| CatalogError::InvalidLocator(format!("{}: {}", raw, e)))?;
        let host = url
            .host_str()
            .ok_or_else(|| CatalogError::InvalidLocator(raw.to_string()))?;
        return split_owner_name(host, url.path(), raw);
    }

    let trimmed = raw.trim_matches('/');
    match trimmed.split_once('/') {
        Some((first, rest)) if first.contains('.') => split_owner_name(first, rest, raw),
        _ => split_owner_name(DEFAULT_HOST, trimmed, raw),
    }
}
