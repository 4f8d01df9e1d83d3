//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (EDSTATS_*)
//! 2. TOML config file (if EDSTATS_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Which cache store backs the read-through cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// `cache_entries` table in the edstats database, shared across processes.
    #[default]
    Sqlite,
    /// In-process map; entries die with the process.
    Memory,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (EDSTATS_*)
/// 2. TOML config file (if EDSTATS_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite database holding cache entries and snapshot tables.
    ///
    /// Set via EDSTATS_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Path to the LMS source database, opened read-only.
    ///
    /// Set via EDSTATS_SOURCE_DB_PATH environment variable.
    #[serde(default = "default_source_db_path")]
    pub source_db_path: PathBuf,

    /// Site name used as the tenant identifier in cache keys.
    ///
    /// Set via EDSTATS_SITE_NAME environment variable. Unset means "default".
    #[serde(default)]
    pub site_name: Option<String>,

    /// Lifetime of cached aggregates in seconds.
    ///
    /// Set via EDSTATS_CACHE_TTL_SECS environment variable.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Cache store backend.
    ///
    /// Set via EDSTATS_CACHE_BACKEND environment variable (`sqlite` or `memory`).
    #[serde(default)]
    pub cache_backend: CacheBackend,

    /// Seconds between scheduled snapshot refreshes; 0 disables the scheduler.
    ///
    /// Set via EDSTATS_REFRESH_INTERVAL_SECS environment variable.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Number of rows in the dashboard "top" lists.
    ///
    /// Set via EDSTATS_DASHBOARD_TOP_ITEMS environment variable.
    #[serde(default = "default_dashboard_top_items")]
    pub dashboard_top_items: usize,

    /// Delete snapshot rows whose natural key vanished from the source.
    ///
    /// Set via EDSTATS_PRUNE_ORPHANS environment variable.
    #[serde(default)]
    pub prune_orphans: bool,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./edstats.sqlite")
}

fn default_source_db_path() -> PathBuf {
    PathBuf::from("./lms.sqlite")
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

fn default_refresh_interval_secs() -> u64 {
    3600
}

fn default_dashboard_top_items() -> usize {
    10
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            source_db_path: default_source_db_path(),
            site_name: None,
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_backend: CacheBackend::default(),
            refresh_interval_secs: default_refresh_interval_secs(),
            dashboard_top_items: default_dashboard_top_items(),
            prune_orphans: false,
        }
    }
}

impl AppConfig {
    /// Cache TTL as Duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Scheduler period, or None when scheduled refresh is disabled.
    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.refresh_interval_secs > 0).then(|| Duration::from_secs(self.refresh_interval_secs))
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `EDSTATS_`
    /// 2. TOML file from `EDSTATS_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("EDSTATS_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("EDSTATS_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
