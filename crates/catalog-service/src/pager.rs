//! Registry pager
//!
//! Keeps an ordered, identity-deduplicated view of registry entries and the
//! cursor for the next page. A load-more that brings nothing new clears the
//! cursor even when the backend hands out another token, and a page ceiling
//! caps sources that keep returning a few new entries forever.

use catalog_backend::{CatalogBackend, DEFAULT_SEARCH_LIMIT};
use catalog_core::{
    filter_view, CatalogEvent, RegistryEntry, RegistryEntryId, RegistryPage, TypeFilter,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::error::ServiceResult;
use crate::events::EventHub;
use crate::status::{ErrorSlot, InFlight};

/// Default number of pages a listing may accumulate
pub const DEFAULT_MAX_PAGES: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagerConfig {
    /// Entries requested per search
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,

    /// Pages a listing may hold before the cursor is dropped
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

fn default_search_limit() -> usize {
    DEFAULT_SEARCH_LIMIT
}

fn default_max_pages() -> usize {
    DEFAULT_MAX_PAGES
}

impl Default for PagerConfig {
    fn default() -> Self {
        Self {
            search_limit: DEFAULT_SEARCH_LIMIT,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

impl PagerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit;
        self
    }

    /// Set the page ceiling (at least 1)
    pub fn max_pages(mut self, pages: usize) -> Self {
        self.max_pages = pages.max(1);
        self
    }
}

/// What a search or listing call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Another fetch was in flight, or there was no cursor to continue from
    Skipped,
    /// A page was fetched
    Fetched {
        /// Entries added to the result set
        appended: usize,
        /// Whether a cursor is held for a further page
        has_more: bool,
    },
}

#[derive(Debug, Default)]
struct PagerState {
    query: String,
    results: Vec<RegistryEntry>,
    cursor: Option<String>,
    pages: usize,
}

/// Keep the first occurrence of every identity
fn dedup_page(entries: Vec<RegistryEntry>) -> Vec<RegistryEntry> {
    let mut seen: HashSet<RegistryEntryId> = HashSet::with_capacity(entries.len());
    entries
        .into_iter()
        .filter(|entry| seen.insert(entry.id.clone()))
        .collect()
}

pub struct RegistryPager {
    backend: Arc<dyn CatalogBackend>,
    config: PagerConfig,
    state: RwLock<PagerState>,
    searching: InFlight,
    /// Bumped by `clear`; fetches started under an older value are dropped
    generation: AtomicU64,
    error: ErrorSlot,
    events: EventHub,
}

impl RegistryPager {
    pub fn new(
        backend: Arc<dyn CatalogBackend>,
        config: PagerConfig,
        error: ErrorSlot,
        events: EventHub,
    ) -> Self {
        let max_pages = config.max_pages;
        Self {
            backend,
            config: config.max_pages(max_pages),
            state: RwLock::new(PagerState::default()),
            searching: InFlight::new(),
            generation: AtomicU64::new(0),
            error,
            events,
        }
    }

    fn is_stale(&self, generation: u64) -> bool {
        let stale = self.generation.load(Ordering::Acquire) != generation;
        if stale {
            debug!("Registry was cleared during the fetch, dropping response");
        }
        stale
    }

    pub fn config(&self) -> &PagerConfig {
        &self.config
    }

    pub async fn results(&self) -> Vec<RegistryEntry> {
        self.state.read().await.results.clone()
    }

    pub async fn cursor(&self) -> Option<String> {
        self.state.read().await.cursor.clone()
    }

    pub async fn query(&self) -> String {
        self.state.read().await.query.clone()
    }

    pub async fn has_more(&self) -> bool {
        self.state.read().await.cursor.is_some()
    }

    pub async fn registry_error(&self) -> Option<String> {
        self.error.get().await
    }

    pub fn is_searching(&self) -> bool {
        self.searching.is_active()
    }

    pub async fn filtered(&self, query: &str, type_filter: TypeFilter) -> Vec<RegistryEntry> {
        let state = self.state.read().await;
        filter_view(&state.results, query, type_filter)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Replace the results with one complete search result list
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> ServiceResult<FetchOutcome> {
        let Some(_guard) = self.searching.try_begin() else {
            debug!("Registry fetch already in flight, skipping search");
            return Ok(FetchOutcome::Skipped);
        };

        debug!("Searching registry");
        let generation = self.generation.load(Ordering::Acquire);
        let result: ServiceResult<Vec<RegistryEntry>> = self
            .backend
            .search_registry(query.trim(), self.config.search_limit)
            .await
            .map_err(Into::into);
        if self.is_stale(generation) {
            return Ok(FetchOutcome::Skipped);
        }
        let entries = self.error.capture(result).await?;

        let results = dedup_page(entries);
        let appended = results.len();
        {
            let mut state = self.state.write().await;
            if self.is_stale(generation) {
                return Ok(FetchOutcome::Skipped);
            }
            state.query = query.to_string();
            state.results = results;
            state.cursor = None;
            state.pages = 1;
        }

        info!(results = appended, "Registry search complete");
        self.events.publish(CatalogEvent::RegistryResultsChanged);
        Ok(FetchOutcome::Fetched {
            appended,
            has_more: false,
        })
    }

    /// Browse the registry.
    ///
    /// With `load_more == false` the results are replaced by the first page.
    /// With `load_more == true` the page after the stored cursor is appended,
    /// skipping identities already held; without a cursor this is a no-op.
    #[instrument(skip(self))]
    pub async fn list(&self, load_more: bool) -> ServiceResult<FetchOutcome> {
        let Some(_guard) = self.searching.try_begin() else {
            debug!("Registry fetch already in flight, skipping listing");
            return Ok(FetchOutcome::Skipped);
        };

        let generation = self.generation.load(Ordering::Acquire);
        let cursor = if load_more {
            match self.state.read().await.cursor.clone() {
                Some(cursor) => Some(cursor),
                None => {
                    debug!("No cursor held, nothing more to load");
                    return Ok(FetchOutcome::Skipped);
                }
            }
        } else {
            None
        };

        let result: ServiceResult<RegistryPage> = self
            .backend
            .list_registry(cursor.as_deref())
            .await
            .map_err(Into::into);
        if self.is_stale(generation) {
            return Ok(FetchOutcome::Skipped);
        }
        let page = self.error.capture(result).await?;

        let mut state = self.state.write().await;
        if self.is_stale(generation) {
            return Ok(FetchOutcome::Skipped);
        }
        let appended = if load_more {
            let mut seen: HashSet<RegistryEntryId> =
                state.results.iter().map(|e| e.id.clone()).collect();
            let before = state.results.len();
            for entry in page.entries {
                if seen.insert(entry.id.clone()) {
                    state.results.push(entry);
                }
            }
            state.pages += 1;
            state.results.len() - before
        } else {
            state.query.clear();
            state.results = dedup_page(page.entries);
            state.pages = 1;
            state.results.len()
        };
        state.cursor = page.next_cursor;

        if load_more && appended == 0 && state.cursor.is_some() {
            debug!("Page brought no new entries, dropping cursor");
            state.cursor = None;
        }
        if state.pages >= self.config.max_pages && state.cursor.is_some() {
            warn!(pages = state.pages, "Registry page ceiling reached, dropping cursor");
            state.cursor = None;
        }

        let has_more = state.cursor.is_some();
        let total = state.results.len();
        drop(state);

        info!(appended, total, has_more, "Registry page loaded");
        self.events.publish(CatalogEvent::RegistryResultsChanged);
        Ok(FetchOutcome::Fetched { appended, has_more })
    }

    /// Reset query, results, cursor and error.
    ///
    /// A search or listing still in flight is discarded when it returns.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        *state = PagerState::default();
        self.generation.fetch_add(1, Ordering::AcqRel);
        drop(state);
        self.error.clear().await;
        self.events.publish(CatalogEvent::RegistryResultsChanged);
    }
}
