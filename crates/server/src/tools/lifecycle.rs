//! worker_install, worker_activate, worker_status and the client_* tools.
//!
//! Install populates the current cache generation; activate sweeps older
//! generations and claims open windows. The client tools stand in for the
//! pages themselves: register one, read what the worker posted to it, close it.

use pwacache_client::fetch::canonicalize;
use pwacache_client::{ActivateReport, ClientRegistry, Clients, InstallReport, ServiceWorker, WindowClient, WorkerStatus};
use pwacache_core::Error;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::json_result;

/// Output from the worker_install tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InstallOutput {
    /// Cache generation that was populated.
    pub cache_name: String,
    /// Number of static assets stored.
    pub assets: usize,
    /// Whether the worker will take over without waiting.
    pub skip_waiting: bool,
    pub installed_at: String,
}

impl From<InstallReport> for InstallOutput {
    fn from(report: InstallReport) -> Self {
        Self {
            cache_name: report.cache_name,
            assets: report.assets,
            skip_waiting: report.skip_waiting,
            installed_at: report.installed_at,
        }
    }
}

/// Output from the worker_activate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ActivateOutput {
    pub cache_name: String,
    /// Old generations that were deleted.
    pub deleted: Vec<String>,
    /// Windows that came under control.
    pub claimed: usize,
    pub activated_at: String,
}

impl From<ActivateReport> for ActivateOutput {
    fn from(report: ActivateReport) -> Self {
        Self {
            cache_name: report.cache_name,
            deleted: report.deleted,
            claimed: report.claimed,
            activated_at: report.activated_at,
        }
    }
}

/// Output from the worker_status tool.
#[derive(Debug, Clone, Serialize)]
pub struct StatusOutput {
    #[serde(flatten)]
    pub worker: WorkerStatus,
    /// Cache buckets currently in storage.
    pub buckets: Vec<String>,
    /// Open windows.
    pub clients: Vec<WindowClient>,
}

/// Parameters for the client_register tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientRegisterParams {
    /// URL of the page that was opened.
    pub url: String,
}

/// Parameters for the client_messages and client_close tools.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientIdParams {
    /// Window id, as returned by client_register or a notification click.
    pub id: String,
}

/// Output from the client_messages tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientMessagesOutput {
    pub id: String,
    /// Messages posted since the last read, oldest first.
    pub messages: Vec<Value>,
}

/// Output from the client_close tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientCloseOutput {
    pub id: String,
    pub closed: bool,
}

pub async fn install_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let report = worker.on_install().await?;
    json_result(&InstallOutput::from(report))
}

pub async fn activate_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let report = worker.on_activate().await?;
    json_result(&ActivateOutput::from(report))
}

pub async fn status_impl(worker: &ServiceWorker, clients: &ClientRegistry) -> Result<CallToolResult, McpError> {
    let output = StatusOutput {
        worker: worker.status().await,
        buckets: worker.storage().bucket_names().await?,
        clients: clients.match_all().await,
    };
    json_result(&output)
}

/// Record a page opened by the user so clicks and claims can find it.
pub async fn register_impl(clients: &ClientRegistry, params: ClientRegisterParams) -> Result<CallToolResult, McpError> {
    let url = canonicalize(&params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let client = clients.register(url).await;
    json_result(&client)
}

/// Drain the messages the worker posted to a window.
pub async fn messages_impl(clients: &ClientRegistry, params: ClientIdParams) -> Result<CallToolResult, McpError> {
    let messages = clients
        .take_messages(&params.id)
        .await
        .ok_or_else(|| Error::InvalidInput(format!("unknown client {}", params.id)))?;
    json_result(&ClientMessagesOutput { id: params.id, messages })
}

/// Forget a window. Closing an unknown id is not an error.
pub async fn client_close_impl(clients: &ClientRegistry, params: ClientIdParams) -> Result<CallToolResult, McpError> {
    let closed = clients.close(&params.id).await;
    if closed {
        tracing::debug!("closed {}", params.id);
    }
    json_result(&ClientCloseOutput { id: params.id, closed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::push::{NotificationClickParams, click_impl};
    use crate::tools::test_support::{assets, output, worker};
    use serde_json::json;

    #[tokio::test]
    async fn test_install_then_activate() {
        let (worker, _clients) = worker(assets()).await;
        worker.storage().open_bucket("quotle-pwa-v1.2.8").await.unwrap();

        let installed: InstallOutput = output(&install_impl(&worker).await.unwrap());
        assert_eq!(installed.cache_name, "quotle-pwa-v1.2.9");
        assert_eq!(installed.assets, 3);

        let activated: ActivateOutput = output(&activate_impl(&worker).await.unwrap());
        assert_eq!(activated.deleted, vec!["quotle-pwa-v1.2.8"]);
    }

    #[tokio::test]
    async fn test_install_failure_maps_to_error() {
        let (worker, _clients) = worker(Default::default()).await;
        let err = install_impl(&worker).await.unwrap_err();
        assert_eq!(err.code.0, -32013);
    }

    #[tokio::test]
    async fn test_status_lists_clients_and_buckets() {
        let (worker, clients) = worker(assets()).await;
        register_impl(&clients, ClientRegisterParams { url: "https://quotle.example/".into() })
            .await
            .unwrap();
        install_impl(&worker).await.unwrap();

        let status: Value = output(&status_impl(&worker, &clients).await.unwrap());
        assert_eq!(status["state"], "installed");
        assert_eq!(status["version"], "v1.2.9");
        assert_eq!(status["buckets"][0], "quotle-pwa-v1.2.9");
        assert_eq!(status["clients"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_register_rejects_empty_url() {
        let (_worker, clients) = worker(assets()).await;
        let result = register_impl(&clients, ClientRegisterParams { url: "  ".into() }).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_messages_drains_click_message() {
        let (worker, clients) = worker(assets()).await;
        let page: Value =
            output(&register_impl(&clients, ClientRegisterParams { url: "https://quotle.example/".into() }).await.unwrap());
        let id = page["id"].as_str().unwrap().to_string();

        let click = NotificationClickParams { action: "log".into(), data: json!({"url": "/"}) };
        click_impl(&worker, click).await.unwrap();

        let params = ClientIdParams { id: id.clone() };
        let out: ClientMessagesOutput = output(&messages_impl(&clients, params.clone()).await.unwrap());
        assert_eq!(out.id, id);
        assert_eq!(out.messages, vec![json!({"type": "notification-click", "action": "log", "data": {"url": "/"}})]);

        let again: ClientMessagesOutput = output(&messages_impl(&clients, params).await.unwrap());
        assert!(again.messages.is_empty());
    }

    #[tokio::test]
    async fn test_messages_unknown_client() {
        let (_worker, clients) = worker(assets()).await;
        let err = messages_impl(&clients, ClientIdParams { id: "client-404".into() }).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }

    #[tokio::test]
    async fn test_close_forgets_window() {
        let (worker, clients) = worker(assets()).await;
        let page: Value =
            output(&register_impl(&clients, ClientRegisterParams { url: "https://quotle.example/".into() }).await.unwrap());
        let id = page["id"].as_str().unwrap().to_string();

        let params = ClientIdParams { id: id.clone() };
        let out: ClientCloseOutput = output(&client_close_impl(&clients, params.clone()).await.unwrap());
        assert!(out.closed);
        let again: ClientCloseOutput = output(&client_close_impl(&clients, params.clone()).await.unwrap());
        assert!(!again.closed);

        let status: Value = output(&status_impl(&worker, &clients).await.unwrap());
        assert!(status["clients"].as_array().unwrap().is_empty());
        assert!(messages_impl(&clients, params).await.is_err());
    }
}
