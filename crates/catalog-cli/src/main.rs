//! Catalog Sync CLI
//!
//! Drives the catalog engine over the in-memory backend. State lives in a
//! JSON state file that is read on start and rewritten after each command,
//! so identities printed by one invocation can be used by the next.

mod commands;
mod config;
mod telemetry;

use anyhow::{Context, Result};
use catalog_backend::{Fixture, InMemoryBackend, InMemoryConfig};
use catalog_service::CatalogLibrary;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use commands::{Command, LoggingRefresher};
use config::AppConfig;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration directory
    #[arg(short, long, env = "CONFIG_DIR", default_value = "config")]
    config_dir: String,

    /// Environment (development, production, etc.)
    #[arg(short, long, env = "ENVIRONMENT", default_value = "development")]
    environment: String,

    /// Fixture used to populate a fresh state
    #[arg(long, env = "CATALOG_SYNC_FIXTURE")]
    fixture: Option<PathBuf>,

    /// State file read on start and rewritten after the command
    #[arg(long, env = "CATALOG_SYNC_STATE")]
    state: Option<PathBuf>,

    /// Log level
    #[arg(long, env = "RUST_LOG")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut config = AppConfig::load_or_default(&args.config_dir, &args.environment);

    // Override with command-line arguments
    if let Some(fixture) = args.fixture {
        config.backend.fixture = Some(fixture);
    }
    if let Some(state) = args.state {
        config.backend.state_file = Some(state);
    }
    if let Some(log_level) = args.log_level {
        config.logging.level = log_level;
    }

    telemetry::init_with_config(telemetry::TelemetryConfig::from(&config.logging));

    debug!(
        environment = %args.environment,
        config_dir = %args.config_dir,
        "Configuration loaded"
    );

    let backend = Arc::new(open_backend(&config).await?);
    let library = CatalogLibrary::builder()
        .backend(backend.clone())
        .refresher(Arc::new(LoggingRefresher))
        .config(config.library_config())
        .build()?;
    library.initialize().await;

    let result = commands::execute(&library, args.command).await;

    // Persist even when the command failed part-way
    if let Some(state_file) = &config.backend.state_file {
        backend
            .snapshot()
            .await
            .save(state_file)
            .with_context(|| format!("Failed to write state file {}", state_file.display()))?;
        info!(path = %state_file.display(), "State saved");
    }

    let output = result?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Restore from the state file when it exists, else start from the fixture
async fn open_backend(config: &AppConfig) -> Result<InMemoryBackend> {
    let backend_config = InMemoryConfig::new().registry_page_size(config.backend.registry_page_size);

    let source = config
        .backend
        .state_file
        .as_deref()
        .filter(|path| path.exists())
        .or(config.backend.fixture.as_deref());

    match source {
        Some(path) => {
            let fixture = read_fixture(path)?;
            Ok(InMemoryBackend::from_fixture(fixture, backend_config).await?)
        }
        None => {
            debug!("No state or fixture configured, starting empty");
            Ok(InMemoryBackend::with_config(backend_config))
        }
    }
}

fn read_fixture(path: &Path) -> Result<Fixture> {
    Fixture::load(path).with_context(|| format!("Failed to read {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_backend::CatalogBackend;
    use catalog_core::RepoDescriptor;

    #[tokio::test]
    async fn test_open_backend_prefers_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("state.json");
        let fixture = dir.path().join("fixture.json");

        std::fs::write(&fixture, r#"{ "repos": [ { "owner": "acme", "name": "kit" } ] }"#).unwrap();

        let mut config = AppConfig::default();
        config.backend.fixture = Some(fixture);
        config.backend.state_file = Some(state.clone());

        // No state yet: the fixture seeds the backend
        let first = open_backend(&config).await.unwrap();
        let repos = first.list_repos().await.unwrap();
        assert_eq!(repos.len(), 1);
        first
            .add_repo(RepoDescriptor::new("acme", "extra"))
            .await
            .unwrap();
        first.snapshot().await.save(&state).unwrap();

        // With state: identities survive and the fixture does not duplicate them
        let second = open_backend(&config).await.unwrap();
        let restored = second.list_repos().await.unwrap();
        assert_eq!(restored.len(), 2);
        assert!(restored.iter().any(|r| r.id == repos[0].id));
    }

    #[tokio::test]
    async fn test_open_backend_without_sources_is_empty() {
        let backend = open_backend(&AppConfig::default()).await.unwrap();
        assert!(backend.list_repos().await.unwrap().is_empty());
    }

    #[test]
    fn test_args_parse_subcommand() {
        let args = Args::try_parse_from(["catalog-sync", "--state", "s.json", "sync"]).unwrap();
        assert_eq!(args.state.as_deref(), Some(Path::new("s.json")));
        assert!(matches!(args.command, Command::Sync { repo: None }));
    }
}
