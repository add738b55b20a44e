//! Application configuration
//!
//! This module handles hierarchical configuration loading from multiple sources:
//! - Default configuration file
//! - Environment-specific configuration file
//! - Environment variables
//! - Command-line arguments

use catalog_backend::DEFAULT_REGISTRY_PAGE_SIZE;
use catalog_service::{EventConfig, LibraryConfig, PagerConfig};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Prefix of environment variable overrides, e.g. `CATALOG_SYNC__REGISTRY__MAX_PAGES=10`
pub const ENV_PREFIX: &str = "CATALOG_SYNC";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Registry search and paging
    #[serde(default)]
    pub registry: PagerConfig,

    /// Change notification fan-out
    #[serde(default)]
    pub events: EventConfig,

    /// In-memory backend settings
    #[serde(default)]
    pub backend: BackendConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON formatting
    #[serde(default)]
    pub json_format: bool,

    /// Include thread IDs
    #[serde(default)]
    pub include_thread_ids: bool,

    /// Include target module
    #[serde(default = "default_true")]
    pub include_target: bool,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            include_thread_ids: false,
            include_target: true,
        }
    }
}

/// Backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Fixture loaded when no state file exists yet
    #[serde(default)]
    pub fixture: Option<PathBuf>,

    /// State file read on start and rewritten after every command
    #[serde(default)]
    pub state_file: Option<PathBuf>,

    /// Entries per registry page
    #[serde(default = "default_page_size")]
    pub registry_page_size: usize,
}

fn default_page_size() -> usize {
    DEFAULT_REGISTRY_PAGE_SIZE
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            fixture: None,
            state_file: None,
            registry_page_size: default_page_size(),
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. Default configuration file (config/default.toml)
    /// 2. Environment-specific file (config/{env}.toml)
    /// 3. Environment variables (CATALOG_SYNC__*)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be parsed
    pub fn load(config_dir: impl Into<PathBuf>, environment: &str) -> Result<Self, ConfigError> {
        let config_dir = config_dir.into();

        let config = Config::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", environment))).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration, falling back to defaults on error
    pub fn load_or_default(config_dir: impl Into<PathBuf>, environment: &str) -> Self {
        Self::load(config_dir, environment).unwrap_or_else(|e| {
            eprintln!("Warning: Failed to load configuration: {}", e);
            eprintln!("Using default configuration");
            Self::default()
        })
    }

    /// The part of the configuration consumed by the engine
    pub fn library_config(&self) -> LibraryConfig {
        LibraryConfig::new()
            .registry(self.registry.clone())
            .events(self.events.clone())
    }
}
