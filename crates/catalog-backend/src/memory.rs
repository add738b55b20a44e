//! In-memory implementation of CatalogBackend
//!
//! Holds repositories, items, staged remote contents and a registry listing
//! in process memory. It performs the same authoritative merge a hosted
//! backend would, which makes it the reference implementation for tests and
//! for offline use of the CLI.

use async_trait::async_trait;
use catalog_core::{
    AssetKind, CatalogItem, ItemId, LocalAssetId, RateLimitStatus, RegistryEntry,
    RegistryEntryId, RegistryPage, RepoDescriptor, RepoId, SourceRepo, SyncOutcome,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::backend::{CatalogBackend, ImportResult};
use crate::error::{BackendError, BackendResult};
use crate::fixture::Fixture;

/// Default registry page size
pub const DEFAULT_REGISTRY_PAGE_SIZE: usize = 10;

/// Default hourly request budget reported by `get_rate_limit`
pub const DEFAULT_RATE_LIMIT: u32 = 60;

const CURSOR_PREFIX: &str = "page-";

/// Backend operations, used to address fault injection and call counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListRepos,
    AddRepo,
    RemoveRepo,
    ToggleRepo,
    ListItems,
    SyncRepo,
    SyncAllRepos,
    ImportItem,
    SearchRegistry,
    ListRegistry,
    ImportRegistryEntry,
    GetRateLimit,
    SeedDefaultRepos,
}

/// One asset as it currently exists in a remote repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteAsset {
    pub locator: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub asset_kind: AssetKind,
    #[serde(default)]
    pub payload: Value,
}

impl RemoteAsset {
    pub fn new(locator: impl Into<String>, name: impl Into<String>, asset_kind: AssetKind) -> Self {
        Self {
            locator: locator.into(),
            name: name.into(),
            description: String::new(),
            asset_kind,
            payload: Value::Null,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    fn problem(&self, repo: &SourceRepo) -> Option<String> {
        if self.locator.trim().is_empty() {
            return Some("missing locator".to_string());
        }
        if self.name.trim().is_empty() {
            return Some("missing name".to_string());
        }
        if !repo.content_kind.allows(self.asset_kind) {
            return Some(format!(
                "{} not allowed in a {} repository",
                self.asset_kind, repo.content_kind
            ));
        }
        None
    }

    fn differs_from(&self, item: &CatalogItem) -> bool {
        item.name != self.name
            || item.description != self.description
            || item.asset_kind != self.asset_kind
            || item.payload != self.payload
    }

    fn apply_to(&self, item: &mut CatalogItem, now: DateTime<Utc>) {
        item.name = self.name.clone();
        item.description = self.description.clone();
        item.asset_kind = self.asset_kind;
        item.payload = self.payload.clone();
        item.updated_at = now;
    }

    fn to_item(&self, repo_id: RepoId, now: DateTime<Utc>) -> CatalogItem {
        let mut item = CatalogItem::new(repo_id, self.asset_kind, self.name.clone(), self.locator.trim())
            .with_description(self.description.clone())
            .with_payload(self.payload.clone());
        item.updated_at = now;
        item
    }
}

/// Where a local asset came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum AssetOrigin {
    CatalogItem { item_id: ItemId },
    Registry { entry_id: RegistryEntryId },
}

/// A local asset minted by an import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalAssetRecord {
    pub id: LocalAssetId,
    pub asset_kind: AssetKind,
    pub name: String,
    pub origin: AssetOrigin,
    pub created_at: DateTime<Utc>,
}

/// In-memory backend configuration
#[derive(Debug, Clone)]
pub struct InMemoryConfig {
    /// Entries per registry page
    pub registry_page_size: usize,

    /// Repositories added by `seed_default_repos`
    pub default_repos: Vec<RepoDescriptor>,
}

impl Default for InMemoryConfig {
    fn default() -> Self {
        Self {
            registry_page_size: DEFAULT_REGISTRY_PAGE_SIZE,
            default_repos: starter_repos(),
        }
    }
}

impl InMemoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the registry page size (at least 1)
    pub fn registry_page_size(mut self, size: usize) -> Self {
        self.registry_page_size = size.max(1);
        self
    }

    /// Replace the starter repository set
    pub fn default_repos(mut self, repos: Vec<RepoDescriptor>) -> Self {
        self.default_repos = repos;
        self
    }
}

/// Starter repositories added by a fresh installation
pub fn starter_repos() -> Vec<RepoDescriptor> {
    use catalog_core::{ContentKind, RepoLayout};

    vec![
        RepoDescriptor::new("asset-hub", "starter-skills")
            .content_kind(ContentKind::Single(AssetKind::Skill)),
        RepoDescriptor::new("asset-hub", "starter-agents")
            .content_kind(ContentKind::Single(AssetKind::SubAgent)),
        RepoDescriptor::new("asset-hub", "awesome-commands")
            .layout(RepoLayout::ReadmeEnumerated)
            .content_kind(ContentKind::Single(AssetKind::Command)),
        RepoDescriptor::new("asset-hub", "starter-kit"),
    ]
}

#[derive(Debug, Clone)]
struct RemoteSnapshot {
    revision: u64,
    assets: Vec<RemoteAsset>,
}

#[derive(Debug)]
struct State {
    repos: BTreeMap<RepoId, SourceRepo>,
    items: BTreeMap<ItemId, CatalogItem>,
    remotes: HashMap<String, RemoteSnapshot>,
    registry: Vec<RegistryEntry>,
    scripted_pages: HashMap<Option<String>, RegistryPage>,
    local_assets: Vec<LocalAssetRecord>,
    rate_limit: RateLimitStatus,
    failures: HashMap<Operation, BackendError>,
    calls: HashMap<Operation, usize>,
    latency: Option<Duration>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            repos: BTreeMap::new(),
            items: BTreeMap::new(),
            remotes: HashMap::new(),
            registry: Vec::new(),
            scripted_pages: HashMap::new(),
            local_assets: Vec::new(),
            rate_limit: RateLimitStatus::new(
                DEFAULT_RATE_LIMIT,
                DEFAULT_RATE_LIMIT,
                Utc::now() + ChronoDuration::hours(1),
            ),
            failures: HashMap::new(),
            calls: HashMap::new(),
            latency: None,
        }
    }
}

fn remote_key(full_name: &str) -> String {
    full_name.trim().trim_matches('/').to_ascii_lowercase()
}

impl State {
    fn repo(&self, id: &RepoId) -> BackendResult<&SourceRepo> {
        self.repos
            .get(id)
            .ok_or_else(|| BackendError::NotFound(format!("repository {}", id)))
    }

    fn consume_budget(&mut self) {
        self.rate_limit.remaining = self.rate_limit.remaining.saturating_sub(1);
    }

    fn insert_repo(&mut self, descriptor: &RepoDescriptor) -> BackendResult<SourceRepo> {
        if let Some(existing) = self.repos.values().find(|r| r.matches(descriptor)) {
            return Err(BackendError::AlreadyExists(existing.full_name()));
        }
        let repo = SourceRepo::from_descriptor(descriptor)?;
        self.repos.insert(repo.id, repo.clone());
        Ok(repo)
    }

    /// Merge the staged remote contents of one repository into the item set
    fn merge_repo(&mut self, repo_id: RepoId, now: DateTime<Utc>) -> BackendResult<SyncOutcome> {
        let repo = self.repo(&repo_id)?.clone();
        let snapshot = self
            .remotes
            .get(&remote_key(&repo.full_name()))
            .cloned()
            .ok_or_else(|| {
                BackendError::Transport(format!("remote contents of {} are unavailable", repo.full_name()))
            })?;

        let etag = format!("rev-{}", snapshot.revision);
        let mut outcome = SyncOutcome::default();

        if repo.etag.as_deref() != Some(etag.as_str()) {
            let existing: HashMap<String, ItemId> = self
                .items
                .values()
                .filter(|item| item.repo_id == repo_id)
                .map(|item| (item.remote_locator.clone(), item.id))
                .collect();

            // A locator listed more than once owns no slot this pass
            let mut occurrences: HashMap<String, usize> = HashMap::new();
            for asset in &snapshot.assets {
                let locator = asset.locator.trim();
                if !locator.is_empty() {
                    *occurrences.entry(locator.to_string()).or_default() += 1;
                }
            }

            let mut seen: HashSet<String> = HashSet::new();
            let mut untouched: HashSet<String> = HashSet::new();

            for asset in &snapshot.assets {
                let locator = asset.locator.trim().to_string();

                if occurrences.get(&locator).copied().unwrap_or(0) > 1 {
                    if untouched.insert(locator.clone()) {
                        outcome.push_error(format!("{}: duplicate locator", locator));
                    }
                    continue;
                }

                if let Some(problem) = asset.problem(&repo) {
                    let label = if locator.is_empty() { "<unnamed>" } else { locator.as_str() };
                    outcome.push_error(format!("{}: {}", label, problem));
                    untouched.insert(locator);
                    continue;
                }

                seen.insert(locator.clone());
                match existing.get(&locator).and_then(|id| self.items.get_mut(id)) {
                    Some(item) => {
                        if asset.differs_from(item) {
                            asset.apply_to(item, now);
                            outcome.updated += 1;
                        }
                    }
                    None => {
                        let item = asset.to_item(repo_id, now);
                        self.items.insert(item.id, item);
                        outcome.added += 1;
                    }
                }
            }

            for (locator, item_id) in &existing {
                if !seen.contains(locator) && !untouched.contains(locator) {
                    self.items.remove(item_id);
                    outcome.removed += 1;
                }
            }
        } else {
            debug!(repo = %repo.full_name(), %etag, "Remote unchanged since last sync");
        }

        if let Some(stored) = self.repos.get_mut(&repo_id) {
            stored.last_synced_at = Some(now);
            stored.etag = Some(etag);
        }

        Ok(outcome)
    }

    fn registry_page(&self, cursor: Option<&str>, page_size: usize) -> BackendResult<RegistryPage> {
        if let Some(page) = self.scripted_pages.get(&cursor.map(str::to_string)) {
            return Ok(page.clone());
        }

        let page_index = match cursor {
            None => 0,
            Some(token) => token
                .strip_prefix(CURSOR_PREFIX)
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| BackendError::Rejected(format!("unknown cursor '{}'", token)))?,
        };

        let start = page_index.saturating_mul(page_size).min(self.registry.len());
        let end = (start + page_size).min(self.registry.len());
        let next_cursor = (end < self.registry.len()).then(|| format!("{}{}", CURSOR_PREFIX, page_index + 1));

        Ok(RegistryPage::new(self.registry[start..end].to_vec(), next_cursor))
    }
}

/// In-memory CatalogBackend
#[derive(Debug)]
pub struct InMemoryBackend {
    state: RwLock<State>,
    config: InMemoryConfig,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    /// Create an empty backend with default configuration
    pub fn new() -> Self {
        Self::with_config(InMemoryConfig::default())
    }

    /// Create an empty backend
    pub fn with_config(config: InMemoryConfig) -> Self {
        Self {
            state: RwLock::new(State::default()),
            config,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &InMemoryConfig {
        &self.config
    }

    async fn enter(&self, op: Operation) -> BackendResult<()> {
        let latency = self.state.read().await.latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.write().await;
        *state.calls.entry(op).or_default() += 1;
        match state.failures.get(&op) {
            Some(err) => {
                warn!(?op, error = %err, "Injected backend failure");
                Err(err.clone())
            }
            None => Ok(()),
        }
    }

    /// Replace the remote contents of `owner/name`, bumping its revision
    pub async fn stage_remote(&self, full_name: &str, assets: Vec<RemoteAsset>) {
        let mut state = self.state.write().await;
        let key = remote_key(full_name);
        let revision = state.remotes.get(&key).map(|s| s.revision + 1).unwrap_or(1);
        state.remotes.insert(key, RemoteSnapshot { revision, assets });
    }

    /// Forget the remote contents of `owner/name`; later syncs fail with a transport error
    pub async fn unstage_remote(&self, full_name: &str) {
        self.state.write().await.remotes.remove(&remote_key(full_name));
    }

    /// Replace the registry listing served page by page
    pub async fn set_registry(&self, entries: Vec<RegistryEntry>) {
        self.state.write().await.registry = entries;
    }

    /// Serve `page` verbatim whenever `cursor` is requested
    pub async fn script_registry_page(&self, cursor: Option<&str>, page: RegistryPage) {
        self.state
            .write()
            .await
            .scripted_pages
            .insert(cursor.map(str::to_string), page);
    }

    pub async fn set_rate_limit(&self, status: RateLimitStatus) {
        self.state.write().await.rate_limit = status;
    }

    /// Make every call of `op` fail with `error` until cleared
    pub async fn fail_on(&self, op: Operation, error: BackendError) {
        self.state.write().await.failures.insert(op, error);
    }

    pub async fn clear_failure(&self, op: Operation) {
        self.state.write().await.failures.remove(&op);
    }

    /// Delay every call by `latency`
    pub async fn set_latency(&self, latency: Option<Duration>) {
        self.state.write().await.latency = latency;
    }

    /// How many times `op` has been invoked
    pub async fn call_count(&self, op: Operation) -> usize {
        self.state.read().await.calls.get(&op).copied().unwrap_or(0)
    }

    /// Local assets minted by imports, in creation order
    pub async fn local_assets(&self) -> Vec<LocalAssetRecord> {
        self.state.read().await.local_assets.clone()
    }

    /// Capture tracked repositories, items, imports, remotes and registry
    /// so the backend can be rebuilt with [`from_fixture`](Self::from_fixture).
    pub async fn snapshot(&self) -> Fixture {
        let state = self.state.read().await;
        Fixture {
            repos: Vec::new(),
            tracked: state.repos.values().cloned().collect(),
            items: state.items.values().cloned().collect(),
            local_assets: state.local_assets.clone(),
            remotes: state
                .remotes
                .iter()
                .map(|(key, snapshot)| (key.clone(), snapshot.assets.clone()))
                .collect(),
            registry: state.registry.clone(),
            rate_limit: Some(state.rate_limit),
        }
    }

    /// Put back previously snapshotted records, ids included.
    ///
    /// Change-detection tokens are dropped so the next sync performs a full
    /// merge against whatever remote contents are staged.
    pub(crate) async fn restore(
        &self,
        tracked: Vec<SourceRepo>,
        items: Vec<CatalogItem>,
        local_assets: Vec<LocalAssetRecord>,
    ) -> BackendResult<()> {
        let mut state = self.state.write().await;
        for mut repo in tracked {
            repo.etag = None;
            state.repos.insert(repo.id, repo);
        }
        for item in items {
            if !state.repos.contains_key(&item.repo_id) {
                return Err(BackendError::InvalidData(format!(
                    "item {} references unknown repository {}",
                    item.id, item.repo_id
                )));
            }
            item.validate()
                .map_err(|e| BackendError::InvalidData(format!("item {}: {}", item.id, e)))?;
            if let Some(taken) = state.items.values().find(|held| held.same_slot(&item)) {
                return Err(BackendError::InvalidData(format!(
                    "items {} and {} share locator {}",
                    taken.id, item.id, item.remote_locator
                )));
            }
            state.items.insert(item.id, item);
        }
        state.local_assets.extend(local_assets);
        Ok(())
    }

    /// Look up a tracked repository by `owner/name`
    pub async fn find_repo(&self, full_name: &str) -> Option<SourceRepo> {
        let key = remote_key(full_name);
        self.state
            .read()
            .await
            .repos
            .values()
            .find(|r| remote_key(&r.full_name()) == key)
            .cloned()
    }
}

#[async_trait]
impl CatalogBackend for InMemoryBackend {
    #[instrument(skip(self))]
    async fn list_repos(&self) -> BackendResult<Vec<SourceRepo>> {
        self.enter(Operation::ListRepos).await?;
        Ok(self.state.read().await.repos.values().cloned().collect())
    }

    #[instrument(skip(self, descriptor), fields(repo = %descriptor.full_name()))]
    async fn add_repo(&self, descriptor: RepoDescriptor) -> BackendResult<SourceRepo> {
        self.enter(Operation::AddRepo).await?;
        let repo = self.state.write().await.insert_repo(&descriptor)?;
        info!(repo_id = %repo.id, "Repository added");
        Ok(repo)
    }

    #[instrument(skip(self), fields(repo_id = %id))]
    async fn remove_repo(&self, id: &RepoId) -> BackendResult<()> {
        self.enter(Operation::RemoveRepo).await?;
        let mut state = self.state.write().await;
        state
            .repos
            .remove(id)
            .ok_or_else(|| BackendError::NotFound(format!("repository {}", id)))?;
        let before = state.items.len();
        state.items.retain(|_, item| item.repo_id != *id);
        debug!(purged = before - state.items.len(), "Repository removed with its items");
        Ok(())
    }

    #[instrument(skip(self), fields(repo_id = %id))]
    async fn toggle_repo(&self, id: &RepoId, enabled: bool) -> BackendResult<()> {
        self.enter(Operation::ToggleRepo).await?;
        let mut state = self.state.write().await;
        let repo = state
            .repos
            .get_mut(id)
            .ok_or_else(|| BackendError::NotFound(format!("repository {}", id)))?;
        repo.enabled = enabled;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_items(&self, repo_id: Option<&RepoId>) -> BackendResult<Vec<CatalogItem>> {
        self.enter(Operation::ListItems).await?;
        let state = self.state.read().await;
        if let Some(id) = repo_id {
            state.repo(id)?;
        }
        Ok(state
            .items
            .values()
            .filter(|item| repo_id.map_or(true, |id| item.repo_id == *id))
            .cloned()
            .collect())
    }

    #[instrument(skip(self), fields(repo_id = %id))]
    async fn sync_repo(&self, id: &RepoId) -> BackendResult<SyncOutcome> {
        self.enter(Operation::SyncRepo).await?;
        let mut state = self.state.write().await;
        state.consume_budget();
        let outcome = state.merge_repo(*id, Utc::now())?;
        info!(%outcome, "Repository synced");
        Ok(outcome)
    }

    #[instrument(skip(self))]
    async fn sync_all_repos(&self) -> BackendResult<SyncOutcome> {
        self.enter(Operation::SyncAllRepos).await?;
        let mut state = self.state.write().await;
        let now = Utc::now();
        let enabled: Vec<(RepoId, String)> = state
            .repos
            .values()
            .filter(|r| r.enabled)
            .map(|r| (r.id, r.full_name()))
            .collect();

        let mut total = SyncOutcome::default();
        for (repo_id, full_name) in enabled {
            state.consume_budget();
            match state.merge_repo(repo_id, now) {
                Ok(outcome) => total.absorb(outcome),
                Err(err) => total.push_error(format!("{}: {}", full_name, err)),
            }
        }
        info!(outcome = %total, "All enabled repositories synced");
        Ok(total)
    }

    #[instrument(skip(self), fields(item_id = %item_id))]
    async fn import_item(&self, item_id: &ItemId) -> BackendResult<ImportResult> {
        self.enter(Operation::ImportItem).await?;
        let mut state = self.state.write().await;
        let item = state
            .items
            .get_mut(item_id)
            .ok_or_else(|| BackendError::NotFound(format!("catalog item {}", item_id)))?;
        if item.is_imported() {
            return Err(BackendError::AlreadyExists(format!("catalog item {} is already imported", item_id)));
        }

        let asset_id = LocalAssetId::new();
        item.mark_imported(asset_id);
        let record = LocalAssetRecord {
            id: asset_id,
            asset_kind: item.asset_kind,
            name: item.name.clone(),
            origin: AssetOrigin::CatalogItem { item_id: *item_id },
            created_at: Utc::now(),
        };
        let asset_kind = record.asset_kind;
        state.local_assets.push(record);

        Ok(ImportResult {
            success: true,
            asset_kind,
            asset_id,
        })
    }

    #[instrument(skip(self))]
    async fn search_registry(&self, query: &str, limit: usize) -> BackendResult<Vec<RegistryEntry>> {
        self.enter(Operation::SearchRegistry).await?;
        let mut state = self.state.write().await;
        state.consume_budget();
        let needle = query.trim().to_lowercase();
        Ok(state
            .registry
            .iter()
            .filter(|e| {
                needle.is_empty()
                    || e.name.to_lowercase().contains(&needle)
                    || e.description.to_lowercase().contains(&needle)
            })
            .take(limit)
            .cloned()
            .collect())
    }

    #[instrument(skip(self))]
    async fn list_registry(&self, cursor: Option<&str>) -> BackendResult<RegistryPage> {
        self.enter(Operation::ListRegistry).await?;
        let mut state = self.state.write().await;
        state.consume_budget();
        state.registry_page(cursor, self.config.registry_page_size)
    }

    #[instrument(skip(self, entry), fields(entry_id = %entry.id))]
    async fn import_registry_entry(&self, entry: &RegistryEntry) -> BackendResult<LocalAssetId> {
        self.enter(Operation::ImportRegistryEntry).await?;
        entry.connection.validate()?;

        let mut state = self.state.write().await;
        let duplicate = state.local_assets.iter().any(|a| {
            matches!(&a.origin, AssetOrigin::Registry { entry_id } if *entry_id == entry.id)
        });
        if duplicate {
            return Err(BackendError::AlreadyExists(format!("registry entry {} is already imported", entry.id)));
        }

        let asset_id = LocalAssetId::new();
        state.local_assets.push(LocalAssetRecord {
            id: asset_id,
            asset_kind: entry.asset_kind,
            name: entry.name.clone(),
            origin: AssetOrigin::Registry {
                entry_id: entry.id.clone(),
            },
            created_at: Utc::now(),
        });
        Ok(asset_id)
    }

    async fn get_rate_limit(&self) -> BackendResult<RateLimitStatus> {
        self.enter(Operation::GetRateLimit).await?;
        Ok(self.state.read().await.rate_limit)
    }

    #[instrument(skip(self))]
    async fn seed_default_repos(&self) -> BackendResult<()> {
        self.enter(Operation::SeedDefaultRepos).await?;
        let mut state = self.state.write().await;
        for descriptor in &self.config.default_repos {
            match state.insert_repo(descriptor) {
                Ok(repo) => debug!(repo = %repo.full_name(), "Seeded starter repository"),
                Err(err) if err.is_already_exists() => {}
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }
}
