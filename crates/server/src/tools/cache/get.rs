//! cache_get tool implementation.
//!
//! Looks up the stored response for a request, in one bucket or across all.

use pwacache_client::FetchRequest;
use pwacache_core::{AppConfig, CacheStorage, Error};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Request URL, absolute or relative to the worker scope.
    pub url: String,

    /// HTTP method of the stored request (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Bucket to search. Searches every bucket, oldest first, when omitted.
    #[serde(default)]
    pub bucket: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub bucket: String,
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8, lossily.
    pub body: String,
    pub size: usize,
    pub stored_at: String,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(
    storage: &CacheStorage, config: &AppConfig, params: CacheGetParams,
) -> Result<CallToolResult, McpError> {
    let url = config
        .resolve(params.url.trim())
        .map_err(|e| Error::InvalidUrl(format!("{}: {e}", params.url)))?;
    let request = FetchRequest::parse(&params.method, url.as_str(), "no-cors")?;
    let key = request.cache_key();

    let entry = match &params.bucket {
        Some(bucket) => storage.match_entry(bucket, &key).await?,
        None => storage.match_any(&key).await?,
    }
    .ok_or_else(|| Error::CacheMiss(request.url.to_string()))?;

    let output = CacheGetOutput {
        content_type: entry.header("content-type").map(str::to_string),
        body: String::from_utf8_lossy(&entry.body).into_owned(),
        size: entry.body.len(),
        bucket: entry.bucket,
        url: entry.url,
        status: entry.status,
        headers: entry.headers,
        stored_at: entry.stored_at,
    };
    json_result(&output)
}
