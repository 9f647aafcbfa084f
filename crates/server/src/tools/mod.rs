//! MCP tool implementations.
//!
//! One tool per worker trigger, plus read-only views of the cache.

pub mod cache;
pub mod fetch;
pub mod lifecycle;
pub mod message;
pub mod push;
pub mod sync;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use crate::error::HostError;

/// Wrap a tool output as pretty-printed JSON text.
pub fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| HostError::OutputFailed(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
