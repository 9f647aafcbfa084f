//! worker_sync tool implementation.
//!
//! Fires a one-off or periodic background sync by tag. Unknown tags are
//! reported as not handled.

use pwacache_client::ServiceWorker;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::error::HostError;

/// Parameters for the worker_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerSyncParams {
    /// Sync tag, e.g. "sync-game-logs" or "check-streaks".
    pub tag: String,

    /// Fire as a periodic sync instead of a one-off sync.
    #[serde(default)]
    pub periodic: bool,
}

/// Output from the worker_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerSyncOutput {
    pub tag: String,
    pub periodic: bool,
    /// Whether a handler ran for the tag.
    pub handled: bool,
}

pub async fn sync_impl(worker: &ServiceWorker, params: WorkerSyncParams) -> Result<CallToolResult, McpError> {
    if params.tag.is_empty() {
        return Err(HostError::InvalidInput("tag cannot be empty".into()).into());
    }

    let handled = if params.periodic {
        worker.on_periodic_sync(&params.tag).await
    } else {
        worker.on_sync(&params.tag).await
    };

    json_result(&WorkerSyncOutput { tag: params.tag, periodic: params.periodic, handled })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{assets, output, worker};

    #[tokio::test]
    async fn test_sync_tags() {
        let (worker, _clients) = worker(assets()).await;

        let out: WorkerSyncOutput =
            output(&sync_impl(&worker, WorkerSyncParams { tag: "sync-game-logs".into(), periodic: false }).await.unwrap());
        assert!(out.handled);

        let out: WorkerSyncOutput =
            output(&sync_impl(&worker, WorkerSyncParams { tag: "check-streaks".into(), periodic: true }).await.unwrap());
        assert!(out.handled);

        let out: WorkerSyncOutput =
            output(&sync_impl(&worker, WorkerSyncParams { tag: "check-streaks".into(), periodic: false }).await.unwrap());
        assert!(!out.handled);
    }

    #[tokio::test]
    async fn test_sync_empty_tag() {
        let (worker, _clients) = worker(assets()).await;
        let result = sync_impl(&worker, WorkerSyncParams { tag: String::new(), periodic: false }).await;
        assert!(result.is_err());
    }
}
