//! worker_message tool implementation.
//!
//! Posts a page message to the worker. `SKIP_WAITING` has no reply,
//! `GET_VERSION` answers `{version}` and `CLEAR_CACHE` answers `{cleared}`.

use pwacache_client::{MessageReply, ServiceWorker};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::json_result;

/// Parameters for the worker_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerMessageParams {
    /// Message object, e.g. `{"type": "GET_VERSION"}`.
    pub message: Value,
}

/// Output from the worker_message tool.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerMessageOutput {
    /// Reply posted on the response channel, if the command has one.
    pub reply: Option<MessageReply>,
}

pub async fn message_impl(worker: &ServiceWorker, params: WorkerMessageParams) -> Result<CallToolResult, McpError> {
    let reply = worker.on_message(&params.message).await?;
    json_result(&WorkerMessageOutput { reply })
}
