//! JSON fixtures for the in-memory backend
//!
//! A fixture describes tracked repositories, the remote contents each one
//! exposes and the registry listing, so the CLI and integration tests can
//! start from a realistic state without a live host application. The same
//! format doubles as a state file: [`InMemoryBackend::snapshot`] produces a
//! fixture that restores repositories and items with their identities.

use catalog_core::{CatalogItem, RateLimitStatus, RegistryEntry, RepoDescriptor, SourceRepo};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

use crate::backend::CatalogBackend;
use crate::error::BackendResult;
use crate::memory::{InMemoryBackend, InMemoryConfig, LocalAssetRecord, RemoteAsset};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    /// Repositories to add on load; new identities are minted
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repos: Vec<RepoDescriptor>,

    /// Repositories restored with their identities and sync timestamps
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tracked: Vec<SourceRepo>,

    /// Catalog items of the tracked repositories
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<CatalogItem>,

    /// Local assets minted by earlier imports
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub local_assets: Vec<LocalAssetRecord>,

    /// Remote contents keyed by `owner/name`
    #[serde(default)]
    pub remotes: BTreeMap<String, Vec<RemoteAsset>>,

    /// Registry listing, served page by page
    #[serde(default)]
    pub registry: Vec<RegistryEntry>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimitStatus>,
}

impl Fixture {
    /// Parse a fixture from JSON text
    pub fn from_json(json: &str) -> BackendResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a fixture file
    pub fn load(path: impl AsRef<Path>) -> BackendResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    /// Write the fixture as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> BackendResult<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), text)?;
        debug!(path = %path.as_ref().display(), "Fixture written");
        Ok(())
    }
}

impl InMemoryBackend {
    /// Build a backend pre-populated from `fixture`
    pub async fn from_fixture(fixture: Fixture, config: InMemoryConfig) -> BackendResult<Self> {
        let backend = Self::with_config(config);
        backend
            .restore(fixture.tracked, fixture.items, fixture.local_assets)
            .await?;

        for descriptor in fixture.repos {
            match backend.add_repo(descriptor).await {
                Ok(_) => {}
                Err(err) if err.is_already_exists() => {
                    debug!(error = %err, "Fixture repository already tracked");
                }
                Err(err) => return Err(err),
            }
        }
        for (full_name, assets) in fixture.remotes {
            backend.stage_remote(&full_name, assets).await;
        }
        backend.set_registry(fixture.registry).await;
        if let Some(status) = fixture.rate_limit {
            backend.set_rate_limit(status).await;
        }

        info!(
            repos = backend.list_repos().await?.len(),
            "In-memory backend loaded from fixture"
        );
        Ok(backend)
    }
}
