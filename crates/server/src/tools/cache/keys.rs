//! cache_keys tool implementation.
//!
//! Lists buckets and the request URLs stored in each.

use pwacache_core::CacheStorage;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the cache_keys tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysParams {
    /// Only list this bucket.
    #[serde(default)]
    pub bucket: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BucketKeys {
    pub name: String,
    pub urls: Vec<String>,
}

/// Output from the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysOutput {
    pub buckets: Vec<BucketKeys>,
}

/// Implementation of the cache_keys tool. An unknown bucket lists as empty.
pub async fn keys_impl(storage: &CacheStorage, params: CacheKeysParams) -> Result<CallToolResult, McpError> {
    let names = match params.bucket {
        Some(name) => vec![name],
        None => storage.bucket_names().await?,
    };

    let mut buckets = Vec::with_capacity(names.len());
    for name in names {
        let urls = storage.entry_urls(&name).await?;
        buckets.push(BucketKeys { name, urls });
    }

    json_result(&CacheKeysOutput { buckets })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{assets, output, worker};

    #[tokio::test]
    async fn test_keys_after_install() {
        let (worker, _clients) = worker(assets()).await;
        worker.on_install().await.unwrap();
        worker.storage().open_bucket("quotle-pwa-v1.2.8").await.unwrap();

        let out: CacheKeysOutput = output(&keys_impl(worker.storage(), CacheKeysParams::default()).await.unwrap());
        assert_eq!(out.buckets.len(), 2);

        let current = out.buckets.iter().find(|b| b.name == "quotle-pwa-v1.2.9").unwrap();
        let mut urls = current.urls.clone();
        urls.sort();
        assert_eq!(
            urls,
            vec![
                "https://quotle.example/",
                "https://quotle.example/index.html",
                "https://quotle.example/manifest.json"
            ]
        );
    }

    #[tokio::test]
    async fn test_keys_single_bucket() {
        let storage = CacheStorage::open_in_memory().await.unwrap();
        let params = CacheKeysParams { bucket: Some("missing".into()) };

        let out: CacheKeysOutput = output(&keys_impl(&storage, params).await.unwrap());
        assert_eq!(out.buckets.len(), 1);
        assert!(out.buckets[0].urls.is_empty());
    }
}
