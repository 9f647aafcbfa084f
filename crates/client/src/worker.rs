//! The worker: one method per trigger.
//!
//! `ServiceWorker` owns the configuration, the storage handle, the network
//! and the window clients. Hosts call `on_install` once per version,
//! `on_activate` when it takes over, and `on_fetch`/`on_message`/`on_push`/
//! `on_notification_click`/`on_sync` as events arrive.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use pwacache_core::{AppConfig, CacheStorage, Error, Strategy};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::RwLock;

use crate::clients::{Clients, WindowClient};
use crate::fetch::{FetchRequest, Fetcher, Response};
use crate::notification::{ClickTarget, Notification, build_notification, parse_payload, resolve_click};
use crate::strategy::{Classifier, Revalidation, Route, StrategyRunner};

/// Sync tag that uploads pending game logs.
pub const SYNC_GAME_LOGS: &str = "sync-game-logs";

/// Periodic sync tag that checks streaks at risk.
pub const CHECK_STREAKS: &str = "check-streaks";

/// Worker lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// Constructed, install not run yet.
    Parsed,
    Installing,
    /// Installed, waiting to activate.
    Installed,
    Activating,
    /// Active and controlling pages.
    Activated,
    /// Install failed; this version never takes over.
    Redundant,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerState::Parsed => write!(f, "parsed"),
            WorkerState::Installing => write!(f, "installing"),
            WorkerState::Installed => write!(f, "installed"),
            WorkerState::Activating => write!(f, "activating"),
            WorkerState::Activated => write!(f, "activated"),
            WorkerState::Redundant => write!(f, "redundant"),
        }
    }
}

/// Commands accepted on the message channel, tagged by `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum WorkerMessage {
    #[serde(rename = "SKIP_WAITING")]
    SkipWaiting,
    #[serde(rename = "GET_VERSION")]
    GetVersion,
    #[serde(rename = "CLEAR_CACHE")]
    ClearCache,
    #[serde(other)]
    Unknown,
}

impl WorkerMessage {
    /// Anything that is not a known command, including malformed JSON, is `Unknown`.
    pub fn from_value(value: &Value) -> Self {
        WorkerMessage::deserialize(value).unwrap_or(WorkerMessage::Unknown)
    }
}

/// Reply posted back on the message's response channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MessageReply {
    Version { version: String },
    Cleared { cleared: bool },
}

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub cache_name: String,
    pub assets: usize,
    pub skip_waiting: bool,
    /// RFC 3339 completion time.
    pub installed_at: String,
}

/// Result of activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivateReport {
    pub cache_name: String,
    /// Old generations that were deleted.
    pub deleted: Vec<String>,
    /// Windows that came under control.
    pub claimed: usize,
    /// RFC 3339 completion time.
    pub activated_at: String,
}

/// Snapshot of the worker for status queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerStatus {
    pub version: String,
    pub cache_name: String,
    pub state: WorkerState,
    pub skip_waiting: bool,
}

/// What happened to an offered request.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Not intercepted; the page talks to the network directly.
    Passthrough,
    Respond {
        route: Route,
        response: Response,
        /// Background fetch still running after the response was produced.
        revalidation: Option<Revalidation>,
    },
}

impl FetchOutcome {
    pub fn response(&self) -> Option<&Response> {
        match self {
            FetchOutcome::Passthrough => None,
            FetchOutcome::Respond { response, .. } => Some(response),
        }
    }
}

/// A click on a shown notification.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NotificationClick {
    /// Action button code; empty when the body was clicked.
    #[serde(default)]
    pub action: String,
    /// The notification's `data`.
    #[serde(default)]
    pub data: Value,
}

/// What a notification click did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum ClickOutcome {
    /// Notification closed, nothing navigated.
    Closed,
    /// An open window was messaged and focused.
    Focused { client: WindowClient },
    /// A new window was opened.
    Opened { client: WindowClient },
}

/// Offline-first asset cache for one app version.
pub struct ServiceWorker {
    config: Arc<AppConfig>,
    storage: CacheStorage,
    fetcher: Arc<dyn Fetcher>,
    clients: Arc<dyn Clients>,
    classifier: Classifier,
    runner: StrategyRunner,
    state: RwLock<WorkerState>,
    skip_waiting: AtomicBool,
}

impl ServiceWorker {
    pub fn new(
        config: AppConfig, storage: CacheStorage, fetcher: Arc<dyn Fetcher>, clients: Arc<dyn Clients>,
    ) -> Self {
        let config = Arc::new(config);
        let classifier = Classifier::from_config(&config);
        let runner = StrategyRunner::new(config.clone(), storage.clone(), fetcher.clone());
        tracing::info!("service worker loaded, version {}", config.version);

        Self {
            config,
            storage,
            fetcher,
            clients,
            classifier,
            runner,
            state: RwLock::new(WorkerState::Parsed),
            skip_waiting: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn storage(&self) -> &CacheStorage {
        &self.storage
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    pub async fn status(&self) -> WorkerStatus {
        WorkerStatus {
            version: self.config.version.clone(),
            cache_name: self.config.cache_name(),
            state: self.state().await,
            skip_waiting: self.skip_waiting.load(Ordering::SeqCst),
        }
    }

    async fn set_state(&self, state: WorkerState) {
        *self.state.write().await = state;
        tracing::debug!("worker {} is {}", self.config.version, state);
    }

    /// Download every static asset into the current generation.
    ///
    /// All assets are fetched before anything is written; one failure
    /// aborts the install and leaves storage untouched.
    ///
    /// # Errors
    ///
    /// Returns `Error::InstallFailed` if an asset cannot be fetched or
    /// answers with a non-2xx status, or the write fails.
    pub async fn on_install(&self) -> Result<InstallReport, Error> {
        let cache_name = self.config.cache_name();
        tracing::info!("installing version {}", self.config.version);
        self.set_state(WorkerState::Installing).await;

        let result = self.populate(&cache_name).await;
        let assets = match result {
            Ok(assets) => assets,
            Err(e) => {
                tracing::error!("install failed: {}", e);
                self.set_state(WorkerState::Redundant).await;
                return Err(e);
            }
        };

        if self.config.skip_waiting_on_install {
            self.skip_waiting.store(true, Ordering::SeqCst);
        }
        self.set_state(WorkerState::Installed).await;
        tracing::info!("install complete, {} assets in {}", assets, cache_name);

        Ok(InstallReport {
            cache_name,
            assets,
            skip_waiting: self.skip_waiting.load(Ordering::SeqCst),
            installed_at: Utc::now().to_rfc3339(),
        })
    }

    async fn populate(&self, cache_name: &str) -> Result<usize, Error> {
        let mut entries = Vec::with_capacity(self.config.static_assets.len());

        for path in &self.config.static_assets {
            let url = self
                .config
                .resolve(path)
                .map_err(|e| Error::InstallFailed(format!("{path}: {e}")))?;
            let request = FetchRequest::get(url);
            let response = self
                .fetcher
                .fetch(&request)
                .await
                .map_err(|e| Error::InstallFailed(format!("{path}: {e}")))?;

            if !response.status.is_success() {
                return Err(Error::InstallFailed(format!("{path} returned {}", response.status.as_u16())));
            }
            entries.push(response.to_entry(cache_name, &request));
        }

        let count = entries.len();
        self.storage
            .open_bucket(cache_name)
            .await
            .map_err(|e| Error::InstallFailed(e.to_string()))?;
        self.storage
            .put_entries(entries)
            .await
            .map_err(|e| Error::InstallFailed(e.to_string()))?;
        Ok(count)
    }

    /// Delete old generations of this app, then claim every open window.
    ///
    /// A failed sweep puts the worker back in the state it held before.
    pub async fn on_activate(&self) -> Result<ActivateReport, Error> {
        let cache_name = self.config.cache_name();
        tracing::info!("activating version {}", self.config.version);
        let previous = self.state().await;
        self.set_state(WorkerState::Activating).await;

        let swept = self
            .storage
            .sweep_generations(&self.config.cache_prefix(), &cache_name)
            .await;
        let deleted = match swept {
            Ok(deleted) => deleted,
            Err(e) => {
                tracing::error!("activation failed: {}", e);
                self.set_state(previous).await;
                return Err(e);
            }
        };
        for name in &deleted {
            tracing::info!("deleted old cache {}", name);
        }

        let claimed = self.clients.claim().await;
        tracing::info!("claimed {} clients", claimed);
        self.set_state(WorkerState::Activated).await;

        Ok(ActivateReport { cache_name, deleted, claimed, activated_at: Utc::now().to_rfc3339() })
    }

    /// Answer an offered request. Never fails: every intercepted request gets a response.
    pub async fn on_fetch(&self, request: FetchRequest) -> FetchOutcome {
        if !request.is_interceptable(&self.config) {
            tracing::debug!("passing through {} {}", request.method, request.url);
            return FetchOutcome::Passthrough;
        }

        let route = self.classifier.classify(&request);
        tracing::debug!("{} {} via {}", request.method, request.url, route.label());

        let (response, revalidation) = match route {
            Route::Navigation => {
                self.runner
                    .network_first(&request, Some(self.config.navigation_timeout()))
                    .await
            }
            Route::Strategy(Strategy::CacheFirst) => (self.runner.cache_first(&request).await, None),
            Route::Strategy(Strategy::NetworkFirst) => self.runner.network_first(&request, None).await,
            Route::Strategy(Strategy::StaleWhileRevalidate) => self.runner.stale_while_revalidate(&request).await,
        };

        FetchOutcome::Respond { route, response, revalidation }
    }

    /// Handle a command from a page. Unknown commands are ignored.
    pub async fn on_message(&self, message: &Value) -> Result<Option<MessageReply>, Error> {
        tracing::debug!("message received: {}", message);

        match WorkerMessage::from_value(message) {
            WorkerMessage::SkipWaiting => {
                self.skip_waiting.store(true, Ordering::SeqCst);
                Ok(None)
            }
            WorkerMessage::GetVersion => Ok(Some(MessageReply::Version { version: self.config.version.clone() })),
            WorkerMessage::ClearCache => {
                let cache_name = self.config.cache_name();
                self.storage.delete_bucket(&cache_name).await?;
                tracing::info!("cleared cache {}", cache_name);
                Ok(Some(MessageReply::Cleared { cleared: true }))
            }
            WorkerMessage::Unknown => Ok(None),
        }
    }

    /// Build the notification for a push. Bad payloads fall back to defaults.
    pub fn on_push(&self, payload: Option<&str>) -> Notification {
        tracing::debug!("push received");
        build_notification(&self.config.notifications, parse_payload(payload).as_ref())
    }

    /// Close the notification and route the user to the app.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUrl` if the deep link does not resolve against the scope.
    pub async fn on_notification_click(&self, click: &NotificationClick) -> Result<ClickOutcome, Error> {
        tracing::info!("notification clicked: {:?}", click.action);

        let path = match resolve_click(&click.action, &click.data) {
            ClickTarget::Close => return Ok(ClickOutcome::Closed),
            ClickTarget::Navigate(path) => path,
        };

        let existing = self
            .clients
            .match_all()
            .await
            .into_iter()
            .find(|c| self.is_app_window(c));

        if let Some(client) = existing {
            let message = json!({
                "type": "notification-click",
                "action": click.action,
                "data": click.data,
            });
            self.clients.post_message(&client.id, message).await;
            if let Some(client) = self.clients.focus(&client.id).await {
                return Ok(ClickOutcome::Focused { client });
            }
        }

        let url = self
            .config
            .resolve(&path)
            .map_err(|e| Error::InvalidUrl(format!("{path}: {e}")))?;
        let client = self.clients.open_window(url).await;
        Ok(ClickOutcome::Opened { client })
    }

    fn is_app_window(&self, client: &WindowClient) -> bool {
        match &self.config.client_match {
            Some(needle) => client.url.as_str().contains(needle.as_str()),
            None => client.url.origin() == self.config.scope.origin(),
        }
    }

    pub fn on_notification_close(&self, tag: &str) {
        tracing::info!("notification {} closed without action", tag);
    }

    /// Background sync. Returns whether a handler ran for `tag`.
    pub async fn on_sync(&self, tag: &str) -> bool {
        tracing::info!("background sync: {}", tag);
        match tag {
            SYNC_GAME_LOGS => {
                sync_game_logs().await;
                true
            }
            _ => false,
        }
    }

    /// Periodic background sync. Returns whether a handler ran for `tag`.
    pub async fn on_periodic_sync(&self, tag: &str) -> bool {
        tracing::info!("periodic sync: {}", tag);
        match tag {
            CHECK_STREAKS => {
                check_streaks().await;
                true
            }
            _ => false,
        }
    }
}

// Placeholders: pending logs and streak state live in the page's storage.
async fn sync_game_logs() {
    tracing::info!("syncing game logs");
}

async fn check_streaks() {
    tracing::info!("checking streaks in background");
}
