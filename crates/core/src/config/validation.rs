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

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if `app_name` or `version` is empty, and
    /// `ConfigError::Invalid` if:
    /// - `scope` is not an http(s) URL
    /// - `navigation_timeout_ms` is outside 100ms..=60s
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `user_agent` is empty
    /// - a strategy rule has no patterns
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app_name.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "app_name".into(),
                hint: "Set PWACACHE_APP_NAME or app_name in the config file".into(),
            });
        }
        if self.version.trim().is_empty() {
            return Err(ConfigError::Invalid { field: "version".into(), reason: "must not be empty".into() });
        }

        match self.scope.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(ConfigError::Invalid {
                    field: "scope".into(),
                    reason: format!("unsupported scheme: {scheme}"),
                });
            }
        }

        if self.navigation_timeout_ms < 100 || self.navigation_timeout_ms > 60_000 {
            return Err(ConfigError::Invalid {
                field: "navigation_timeout_ms".into(),
                reason: "must be between 100ms and 60000ms".into(),
            });
        }

        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if let Some(rule) = self.strategies.iter().find(|r| r.patterns.iter().all(|p| p.is_empty())) {
            return Err(ConfigError::Invalid {
                field: "strategies".into(),
                reason: format!("{} rule has no patterns", rule.strategy.as_str()),
            });
        }

        if !self.restrict_origin && !self.allowed_hosts.is_empty() {
            tracing::warn!("allowed_hosts is ignored because restrict_origin is off");
        }

        if self.static_assets.is_empty() {
            tracing::warn!("static_assets is empty; install will create an empty generation");
        }

        Ok(())
    }
}
