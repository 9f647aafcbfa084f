//! The three fetch-and-cache behaviours.
//!
//! Every path ends in a response: network failures fall back to the cached
//! entry, then the offline document, then a synthetic 503. Storage errors on
//! lookup count as misses and storage errors on write are logged; neither
//! reaches the caller.

use std::sync::Arc;
use std::time::Duration;

use pwacache_core::{AppConfig, CacheStorage, Error};
use tokio::task::JoinHandle;

use crate::fetch::{FetchRequest, Fetcher, Response, ResponseSource};

/// A network fetch that keeps running after the response was returned.
///
/// Produced by stale-while-revalidate and by a navigation whose fetch lost
/// the race against the timeout. Dropping the handle detaches the task; it
/// still stores its result.
#[derive(Debug)]
pub struct Revalidation {
    handle: JoinHandle<Result<Response, Error>>,
}

impl Revalidation {
    /// Wait for the background fetch. `None` if it failed.
    pub async fn wait(self) -> Option<Response> {
        self.handle.await.ok().and_then(Result::ok)
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Runs strategies against one cache generation.
#[derive(Clone)]
pub struct StrategyRunner {
    config: Arc<AppConfig>,
    storage: CacheStorage,
    fetcher: Arc<dyn Fetcher>,
    bucket: Arc<str>,
}

impl StrategyRunner {
    pub fn new(config: Arc<AppConfig>, storage: CacheStorage, fetcher: Arc<dyn Fetcher>) -> Self {
        let bucket = Arc::from(config.cache_name());
        Self { config, storage, fetcher, bucket }
    }

    /// Cached entry if present, else the network (stored when cacheable), else 503.
    pub async fn cache_first(&self, request: &FetchRequest) -> Response {
        if let Some(hit) = self.lookup(request).await {
            return hit;
        }

        match self.fetch_and_store(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("cache-first {} offline: {}", request.url, e);
                Response::offline()
            }
        }
    }

    /// Network, falling back to cache, the offline document, then 503.
    ///
    /// With a `timeout`, a slow fetch is abandoned in favour of the
    /// fallbacks and handed back as a `Revalidation` so it can still
    /// populate the cache.
    pub async fn network_first(
        &self, request: &FetchRequest, timeout: Option<Duration>,
    ) -> (Response, Option<Revalidation>) {
        let runner = self.clone();
        let owned = request.clone();
        let mut task = tokio::spawn(async move { runner.fetch_and_store(&owned).await });

        let joined = match timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut task).await {
                Ok(joined) => joined,
                Err(_) => {
                    tracing::debug!("network-first {} timed out after {}ms", request.url, limit.as_millis());
                    let response = self.fallback(request).await;
                    return (response, Some(Revalidation { handle: task }));
                }
            },
            None => (&mut task).await,
        };

        match joined {
            Ok(Ok(response)) => (response, None),
            Ok(Err(e)) => {
                tracing::debug!("network-first {} failed: {}", request.url, e);
                (self.fallback(request).await, None)
            }
            Err(e) => {
                tracing::warn!("network-first {} fetch task aborted: {}", request.url, e);
                (self.fallback(request).await, None)
            }
        }
    }

    /// Cached entry immediately plus a background refresh; on a miss, the network once.
    pub async fn stale_while_revalidate(&self, request: &FetchRequest) -> (Response, Option<Revalidation>) {
        if let Some(hit) = self.lookup(request).await {
            let runner = self.clone();
            let owned = request.clone();
            let handle = tokio::spawn(async move {
                let refreshed = runner.fetch_and_store(&owned).await;
                if let Err(e) = &refreshed {
                    tracing::debug!("revalidation of {} failed: {}", owned.url, e);
                }
                refreshed
            });
            return (hit, Some(Revalidation { handle }));
        }

        match self.fetch_and_store(request).await {
            Ok(response) => (response, None),
            Err(e) => {
                tracing::warn!("stale-while-revalidate {} offline: {}", request.url, e);
                (Response::offline(), None)
            }
        }
    }

    /// Fetch from the network and store the response if it is cacheable.
    pub async fn fetch_and_store(&self, request: &FetchRequest) -> Result<Response, Error> {
        let response = self.fetcher.fetch(request).await?;

        if self.is_cacheable(request, &response) {
            let entry = response.to_entry(&self.bucket, request);
            if let Err(e) = self.storage.put_entry(&entry).await {
                tracing::warn!("failed to store {} in {}: {}", request.url, self.bucket, e);
            }
        } else {
            tracing::debug!("not caching {} (status {})", request.url, response.status.as_u16());
        }

        Ok(response)
    }

    fn is_cacheable(&self, request: &FetchRequest, response: &Response) -> bool {
        if !self.config.persist.allows(response.status.as_u16()) {
            return false;
        }
        let host = request.url.host_str().unwrap_or_default();
        !self.config.no_store_hosts.iter().any(|h| host.contains(h.as_str()))
    }

    async fn lookup(&self, request: &FetchRequest) -> Option<Response> {
        match self.storage.match_entry(&self.bucket, &request.cache_key()).await {
            Ok(Some(entry)) => {
                tracing::debug!("cache hit for {} in {}", request.url, self.bucket);
                Some(Response::from_entry(entry, ResponseSource::Cache))
            }
            Ok(None) => {
                tracing::debug!("cache miss for {}", request.url);
                None
            }
            Err(e) => {
                tracing::warn!("cache lookup for {} failed: {}", request.url, e);
                None
            }
        }
    }

    async fn offline_document(&self) -> Option<Response> {
        let path = self.config.offline_document.as_deref()?;
        let url = match self.config.resolve(path) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("offline document {path} does not resolve: {e}");
                return None;
            }
        };

        let mut response = self.lookup(&FetchRequest::get(url)).await?;
        response.source = ResponseSource::OfflineDocument;
        Some(response)
    }

    async fn fallback(&self, request: &FetchRequest) -> Response {
        if let Some(hit) = self.lookup(request).await {
            return hit;
        }
        if let Some(document) = self.offline_document().await {
            return document;
        }
        Response::offline()
    }
}
