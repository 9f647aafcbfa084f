//! worker_fetch tool implementation.
//!
//! Offers a request to the worker and reports how it was answered. A
//! background revalidation is left running unless the caller asks to wait
//! for it.

use pwacache_client::{FetchOutcome, FetchRequest, ServiceWorker};
use pwacache_core::Error;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::error::HostError;

/// Parameters for the worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchParams {
    /// Request URL, absolute or relative to the worker scope.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request mode: "navigate", "same-origin", "no-cors" (default) or "cors".
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Wait for any background revalidation before returning.
    #[serde(default)]
    pub wait_for_revalidation: bool,
}

fn default_method() -> String {
    "GET".into()
}

fn default_mode() -> String {
    "no-cors".into()
}

/// Output from the worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchOutput {
    pub url: String,
    /// False when the request went straight to the network.
    pub intercepted: bool,
    /// Strategy that answered: "navigation", "cache-first", ...
    pub route: Option<String>,
    pub status: Option<u16>,
    /// Where the body came from: "network", "cache", "offline-document" or "synthetic".
    pub source: Option<String>,
    pub content_type: Option<String>,
    /// Body decoded as UTF-8, lossily.
    pub body: Option<String>,
    /// Whether a background fetch was still running when the response was produced.
    pub revalidating: bool,
    /// Status of the awaited revalidation, if the caller waited and it succeeded.
    pub revalidated_status: Option<u16>,
}

pub async fn fetch_impl(worker: &ServiceWorker, params: WorkerFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(HostError::InvalidInput("url cannot be empty".into()).into());
    }

    let url = worker
        .config()
        .resolve(params.url.trim())
        .map_err(|e| Error::InvalidUrl(format!("{}: {e}", params.url)))?;
    let request = FetchRequest::parse(&params.method, url.as_str(), &params.mode)?;
    let url = request.url.to_string();

    let output = match worker.on_fetch(request).await {
        FetchOutcome::Passthrough => WorkerFetchOutput {
            url,
            intercepted: false,
            route: None,
            status: None,
            source: None,
            content_type: None,
            body: None,
            revalidating: false,
            revalidated_status: None,
        },
        FetchOutcome::Respond { route, response, revalidation } => {
            let revalidating = revalidation.is_some();
            let revalidated_status = match revalidation {
                Some(task) if params.wait_for_revalidation => task.wait().await.map(|r| r.status.as_u16()),
                _ => None,
            };

            WorkerFetchOutput {
                url,
                intercepted: true,
                route: Some(route.label().to_string()),
                status: Some(response.status.as_u16()),
                source: serde_json::to_value(&response.source)
                    .ok()
                    .and_then(|v| v.as_str().map(String::from)),
                content_type: response.content_type().map(String::from),
                body: Some(String::from_utf8_lossy(&response.body).into_owned()),
                revalidating,
                revalidated_status,
            }
        }
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{assets, output, worker};

    fn params(url: &str) -> WorkerFetchParams {
        WorkerFetchParams {
            url: url.into(),
            method: default_method(),
            mode: default_mode(),
            wait_for_revalidation: true,
        }
    }

    #[tokio::test]
    async fn test_fetch_post_passes_through() {
        let (worker, _clients) = worker(assets()).await;
        let result = fetch_impl(&worker, WorkerFetchParams { method: "POST".into(), ..params("/api/score") })
            .await
            .unwrap();

        let out: WorkerFetchOutput = output(&result);
        assert!(!out.intercepted);
        assert!(out.status.is_none());
    }

    #[tokio::test]
    async fn test_fetch_revalidates_cached_asset() {
        let (worker, _clients) = worker(assets()).await;
        worker.on_install().await.unwrap();

        let out: WorkerFetchOutput = output(&fetch_impl(&worker, params("./manifest.json")).await.unwrap());
        assert!(out.intercepted);
        assert_eq!(out.route.as_deref(), Some("stale-while-revalidate"));
        assert_eq!(out.source.as_deref(), Some("cache"));
        assert_eq!(out.body.as_deref(), Some("{}"));
        assert!(out.revalidating);
        assert_eq!(out.revalidated_status, Some(200));
    }

    #[tokio::test]
    async fn test_navigation_offline_serves_shell() {
        let (worker, _clients) = worker(assets()).await;
        worker.on_install().await.unwrap();

        let nav = WorkerFetchParams { mode: "navigate".into(), ..params("/puzzle/42") };
        let out: WorkerFetchOutput = output(&fetch_impl(&worker, nav).await.unwrap());
        assert_eq!(out.route.as_deref(), Some("navigation"));
        assert_eq!(out.source.as_deref(), Some("offline-document"));
        assert_eq!(out.body.as_deref(), Some("<html>shell</html>"));
    }

    #[tokio::test]
    async fn test_fetch_invalid_mode() {
        let (worker, _clients) = worker(assets()).await;
        let result = fetch_impl(&worker, WorkerFetchParams { mode: "teleport".into(), ..params("/") }).await;
        assert_eq!(result.unwrap_err().code.0, -32602);
    }

    #[tokio::test]
    async fn test_fetch_empty_url() {
        let (worker, _clients) = worker(assets()).await;
        assert!(fetch_impl(&worker, params(" ")).await.is_err());
    }
}
