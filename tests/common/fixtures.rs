//! Test fixtures
//!
//! This module provides remote contents and registry data for integration tests.

use catalog_backend::RemoteAsset;
use catalog_core::{AssetKind, ConnectionSpec, RegistryEntry, RegistryPage};

/// A remote asset with a description derived from its name
pub fn remote(locator: &str, name: &str, kind: AssetKind) -> RemoteAsset {
    RemoteAsset::new(locator, name, kind).with_description(format!("{} for tests", name))
}

/// Remote contents of a mixed starter repository
pub fn starter_kit() -> Vec<RemoteAsset> {
    vec![
        remote("skills/pdf", "PDF Tools", AssetKind::Skill),
        remote("agents/reviewer.md", "Reviewer", AssetKind::SubAgent),
        remote("commands/commit.md", "commit", AssetKind::Command),
        remote("hooks/fmt.json", "format-on-save", AssetKind::Hook),
        remote("connectors/fs.json", "filesystem", AssetKind::Connector),
    ]
}

/// A stdio connector entry
pub fn entry(id: &str) -> RegistryEntry {
    RegistryEntry::new(id, format!("server-{}", id), ConnectionSpec::stdio("npx"))
        .with_description(format!("Registry entry {}", id))
}

/// `count` entries with ids `e000`, `e001`, ...
pub fn entries(count: usize) -> Vec<RegistryEntry> {
    (0..count).map(|i| entry(&format!("e{:03}", i))).collect()
}

/// A scripted page of the given ids
pub fn page(ids: &[&str], next_cursor: Option<&str>) -> RegistryPage {
    RegistryPage::new(
        ids.iter().map(|id| entry(id)).collect(),
        next_cursor.map(str::to_string),
    )
}
