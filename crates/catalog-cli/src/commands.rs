//! Subcommands and their execution against a [`CatalogLibrary`]

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use catalog_core::{
    ContentKind, ItemId, RegistryEntry, RegistryEntryId, RepoDescriptor, RepoId, RepoLayout,
    TypeFilter,
};
use catalog_service::{CatalogLibrary, FetchOutcome, Refresher};
use clap::{Subcommand, ValueEnum};
use serde_json::{json, Value};
use tracing::info;

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List tracked repositories
    Repos,

    /// Add the starter repositories of a fresh installation
    Seed,

    /// Track a repository given as owner/name or a GitHub URL
    AddRepo {
        locator: String,

        /// file_enumerated or readme_enumerated
        #[arg(long)]
        layout: Option<RepoLayout>,

        /// An asset kind, or "mixed"
        #[arg(long)]
        kind: Option<ContentKind>,
    },

    /// Stop tracking a repository and drop its items
    RemoveRepo { id: RepoId },

    /// Enable or disable a repository
    ToggleRepo { id: RepoId, state: Switch },

    /// Synchronize one repository, or every enabled one
    Sync {
        #[arg(long)]
        repo: Option<RepoId>,
    },

    /// List catalog items
    Items {
        #[arg(short, long, default_value = "")]
        query: String,

        /// An asset kind, or "all"
        #[arg(short = 't', long = "type", default_value = "all")]
        type_filter: TypeFilter,
    },

    /// Search the registry
    Search { query: String },

    /// Browse the registry listing
    Browse {
        /// Number of pages to fetch
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },

    /// Import a catalog item as a local asset
    ImportItem { id: ItemId },

    /// Import a registry entry as a local connector
    ImportEntry {
        id: String,

        /// Look the entry up through a search instead of the listing
        #[arg(long)]
        query: Option<String>,
    },

    /// Show the remote API budget
    RateLimit,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Switch {
    On,
    Off,
}

/// Refresher that only reports which downstream library would reload
#[derive(Debug, Default)]
pub struct LoggingRefresher;

#[async_trait]
impl Refresher for LoggingRefresher {
    async fn refresh_connectors(&self) {
        info!(library = "connectors", "Downstream refresh requested");
    }

    async fn refresh_skills(&self) {
        info!(library = "skills", "Downstream refresh requested");
    }

    async fn refresh_sub_agents(&self) {
        info!(library = "sub_agents", "Downstream refresh requested");
    }
}

/// Run `command` and return what should be printed
pub async fn execute(library: &CatalogLibrary, command: Command) -> Result<Value> {
    let output = match command {
        Command::Repos => json!(library.repos().await),

        Command::Seed => {
            library.repo_catalog().seed_defaults().await?;
            json!(library.repos().await)
        }

        Command::AddRepo {
            locator,
            layout,
            kind,
        } => {
            let mut descriptor = RepoDescriptor::parse(&locator)?;
            if let Some(layout) = layout {
                descriptor = descriptor.layout(layout);
            }
            if let Some(kind) = kind {
                descriptor = descriptor.content_kind(kind);
            }
            json!(library.repo_catalog().add(descriptor).await?)
        }

        Command::RemoveRepo { id } => {
            library.repo_catalog().remove(&id).await?;
            json!({ "removed": id })
        }

        Command::ToggleRepo { id, state } => {
            library
                .repo_catalog()
                .toggle(&id, state == Switch::On)
                .await?;
            json!(library.repo_catalog().get(&id).await)
        }

        Command::Sync { repo } => {
            let outcome = match repo {
                Some(id) => library.sync().sync_one(&id).await?,
                None => library.sync().sync_all().await?,
            };
            let outcome = outcome.ok_or_else(|| anyhow!("a sync is already running"))?;
            json!(outcome)
        }

        Command::Items { query, type_filter } => {
            json!(library.filtered_items(&query, type_filter).await)
        }

        Command::Search { query } => {
            library.registry().search(&query).await?;
            json!(library.registry_results().await)
        }

        Command::Browse { pages } => {
            browse(library, pages.max(1)).await?;
            json!({
                "entries": library.registry_results().await,
                "next_cursor": library.registry().cursor().await,
            })
        }

        Command::ImportItem { id } => json!(library.importer().import_item(&id).await?),

        Command::ImportEntry { id, query } => {
            let id = RegistryEntryId::new(id);
            let entry = find_entry(library, &id, query.as_deref()).await?;
            json!(library.importer().import_entry(&entry).await?)
        }

        Command::RateLimit => json!(library.rate_limit().refresh().await?),
    };
    Ok(output)
}

/// Fetch the first page, then follow the cursor for up to `pages` pages
async fn browse(library: &CatalogLibrary, pages: usize) -> Result<()> {
    library.registry().list(false).await?;
    for _ in 1..pages {
        match library.registry().list(true).await? {
            FetchOutcome::Fetched { has_more: true, .. } => {}
            FetchOutcome::Fetched { has_more: false, .. } | FetchOutcome::Skipped => break,
        }
    }
    Ok(())
}

async fn find_entry(
    library: &CatalogLibrary,
    id: &RegistryEntryId,
    query: Option<&str>,
) -> Result<RegistryEntry> {
    let registry = library.registry();
    let lookup = |results: Vec<RegistryEntry>| results.into_iter().find(|e| &e.id == id);

    if let Some(query) = query {
        registry.search(query).await?;
        return lookup(library.registry_results().await)
            .with_context(|| format!("registry entry {} not among results for '{}'", id, query));
    }

    registry.list(false).await?;
    loop {
        if let Some(entry) = lookup(library.registry_results().await) {
            return Ok(entry);
        }
        match registry.list(true).await? {
            FetchOutcome::Fetched { appended, .. } if appended > 0 => {}
            _ => bail!("registry entry {} not found", id),
        }
    }
}
