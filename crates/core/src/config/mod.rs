//! Worker configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (PWACACHE_*)
//! 2. TOML config file (if PWACACHE_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! Each deployment (app name, version, asset list, strategy table) is one
//! config file; see `deploy/` at the workspace root.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

mod validation;

pub use validation::ConfigError;

/// Fetch-and-cache behaviour selected for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Serve from cache, go to the network only on a miss.
    CacheFirst,
    /// Try the network, fall back to cache and then the offline document.
    NetworkFirst,
    /// Serve from cache and refresh the entry in the background.
    StaleWhileRevalidate,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::CacheFirst => "cache-first",
            Strategy::NetworkFirst => "network-first",
            Strategy::StaleWhileRevalidate => "stale-while-revalidate",
        }
    }
}

/// One row of the classification table.
///
/// A request matches when its full URL contains any of `patterns`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyRule {
    pub strategy: Strategy,
    pub patterns: Vec<String>,
}

impl StrategyRule {
    pub fn new(strategy: Strategy, patterns: &[&str]) -> Self {
        Self { strategy, patterns: patterns.iter().map(|p| p.to_string()).collect() }
    }
}

/// Which fetched responses are written to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PersistPolicy {
    /// Only status 200 exactly.
    #[serde(rename = "status-200")]
    Status200,
    /// Any 2xx status.
    #[serde(rename = "success")]
    Success,
}

impl PersistPolicy {
    pub fn allows(&self, status: u16) -> bool {
        match self {
            PersistPolicy::Status200 => status == 200,
            PersistPolicy::Success => (200..300).contains(&status),
        }
    }
}

/// Default notification content used when a push carries no usable payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationDefaults {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub tag: String,
    /// Destination stored in `data.url`.
    pub url: String,
}

impl Default for NotificationDefaults {
    fn default() -> Self {
        Self {
            title: "Notification".into(),
            body: "You have a notification".into(),
            icon: "/icons/icon-192.png".into(),
            badge: "/icons/badge-72.png".into(),
            tag: "default".into(),
            url: "/".into(),
        }
    }
}

/// Worker configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (PWACACHE_*)
/// 2. TOML config file (if PWACACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Cache name prefix; generations are named `<app_name>-<version>`.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Version string of the running worker.
    #[serde(default = "default_version")]
    pub version: String,

    /// Scope the worker controls. Relative asset paths resolve against it
    /// and its origin is the "same origin" for interception.
    #[serde(default = "default_scope")]
    pub scope: Url,

    /// Paths stored on install.
    #[serde(default = "default_static_assets")]
    pub static_assets: Vec<String>,

    /// Ordered classification table. First match wins.
    #[serde(default)]
    pub strategies: Vec<StrategyRule>,

    /// Strategy for requests no rule matches.
    #[serde(default = "default_strategy")]
    pub default_strategy: Strategy,

    /// How long a navigation waits on the network before using the cache.
    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,

    /// Cached document served when neither network nor cache can answer.
    #[serde(default = "default_offline_document")]
    pub offline_document: Option<String>,

    /// Only intercept same-origin requests and `allowed_hosts`.
    #[serde(default = "default_true")]
    pub restrict_origin: bool,

    /// Cross-origin hosts intercepted when `restrict_origin` is on (substring match).
    #[serde(default)]
    pub allowed_hosts: Vec<String>,

    /// Hosts whose responses are served but never stored (substring match).
    #[serde(default)]
    pub no_store_hosts: Vec<String>,

    /// Which statuses are cacheable.
    #[serde(default = "default_persist")]
    pub persist: PersistPolicy,

    /// Activate as soon as install completes.
    #[serde(default = "default_true")]
    pub skip_waiting_on_install: bool,

    /// Window clients whose URL contains this are focused on notification click.
    #[serde(default)]
    pub client_match: Option<String>,

    #[serde(default)]
    pub notifications: NotificationDefaults,

    /// Path to SQLite cache database.
    ///
    /// Set via PWACACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_app_name() -> String {
    "pwa".into()
}

fn default_version() -> String {
    "v1".into()
}

fn default_scope() -> Url {
    Url::parse("http://localhost/").expect("static scope URL is valid")
}

fn default_static_assets() -> Vec<String> {
    vec!["./".into(), "./index.html".into(), "./manifest.json".into()]
}

fn default_strategy() -> Strategy {
    Strategy::StaleWhileRevalidate
}

fn default_navigation_timeout_ms() -> u64 {
    2_000
}

fn default_offline_document() -> Option<String> {
    Some("./index.html".into())
}

fn default_persist() -> PersistPolicy {
    PersistPolicy::Status200
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./pwacache.sqlite")
}

fn default_user_agent() -> String {
    "pwacache/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            version: default_version(),
            scope: default_scope(),
            static_assets: default_static_assets(),
            strategies: Vec::new(),
            default_strategy: default_strategy(),
            navigation_timeout_ms: default_navigation_timeout_ms(),
            offline_document: default_offline_document(),
            restrict_origin: true,
            allowed_hosts: Vec::new(),
            no_store_hosts: Vec::new(),
            persist: default_persist(),
            skip_waiting_on_install: true,
            client_match: None,
            notifications: NotificationDefaults::default(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Name of the current cache generation.
    pub fn cache_name(&self) -> String {
        format!("{}-{}", self.app_name, self.version)
    }

    /// Prefix shared by every generation of this app.
    pub fn cache_prefix(&self) -> String {
        format!("{}-", self.app_name)
    }

    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    /// Resolve a configured path (asset, offline document, deep link) against the scope.
    pub fn resolve(&self, path: &str) -> Result<Url, url::ParseError> {
        self.scope.join(path)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `PWACACHE_`
    /// 2. TOML file from `PWACACHE_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("PWACACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        Self::extract(figment.merge(
            Env::prefixed("PWACACHE_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        ))
    }

    /// Load configuration from a TOML string layered over the defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the TOML does not parse or validation fails.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        Self::extract(Figment::from(Serialized::defaults(Self::default())).merge(Toml::string(toml)))
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
