//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

const MAX_CACHE_TTL_SECS: u64 = 7 * 24 * 3600;
const MIN_REFRESH_INTERVAL_SECS: u64 = 60;
const MAX_DASHBOARD_TOP_ITEMS: usize = 1000;

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `cache_ttl_secs` is 0 or exceeds one week
    /// - `dashboard_top_items` is 0 or exceeds 1000
    /// - `refresh_interval_secs` is between 1 and 59
    /// - `site_name` is set but blank
    ///
    /// Returns `ConfigError::Missing` if `db_path` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::Missing {
                field: "db_path".into(),
                hint: "Set EDSTATS_DB_PATH environment variable".into(),
            });
        }

        if self.cache_ttl_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "cache_ttl_secs".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if self.cache_ttl_secs > MAX_CACHE_TTL_SECS {
            return Err(ConfigError::Invalid {
                field: "cache_ttl_secs".into(),
                reason: "must not exceed one week (604800s)".into(),
            });
        }

        if self.dashboard_top_items == 0 || self.dashboard_top_items > MAX_DASHBOARD_TOP_ITEMS {
            return Err(ConfigError::Invalid {
                field: "dashboard_top_items".into(),
                reason: "must be between 1 and 1000".into(),
            });
        }

        if self.refresh_interval_secs > 0 && self.refresh_interval_secs < MIN_REFRESH_INTERVAL_SECS {
            return Err(ConfigError::Invalid {
                field: "refresh_interval_secs".into(),
                reason: "must be 0 (disabled) or at least 60s".into(),
            });
        }

        if let Some(site) = &self.site_name {
            if site.trim().is_empty() {
                return Err(ConfigError::Invalid { field: "site_name".into(), reason: "must not be blank".into() });
            }
            if site.contains(':') {
                tracing::warn!(
                    site_name = %site,
                    "site_name contains ':'; a per-tenant cache purge may also clear \
                     tenants whose name starts with this one"
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_db_path() {
        let config = AppConfig { db_path: PathBuf::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Missing { field, .. }) if field == "db_path"));
    }

    #[test]
    fn test_validate_ttl_zero() {
        let config = AppConfig { cache_ttl_secs: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "cache_ttl_secs"));
    }

    #[test]
    fn test_validate_ttl_exceeds_limit() {
        let config = AppConfig { cache_ttl_secs: MAX_CACHE_TTL_SECS + 1, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "cache_ttl_secs"));
    }

    #[test]
    fn test_validate_top_items_bounds() {
        let config = AppConfig { dashboard_top_items: 0, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "dashboard_top_items"));

        let config = AppConfig { dashboard_top_items: 1001, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "dashboard_top_items"));
    }

    #[test]
    fn test_validate_refresh_interval() {
        let config = AppConfig { refresh_interval_secs: 30, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "refresh_interval_secs"));

        let config = AppConfig { refresh_interval_secs: 0, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_blank_site_name() {
        let config = AppConfig { site_name: Some("  ".into()), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "site_name"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig {
            cache_ttl_secs: 1,
            dashboard_top_items: 1,
            refresh_interval_secs: 60,
            site_name: Some("school:west".into()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
