//! Network access for the worker.
//!
//! ### Request model
//! - `FetchRequest`: method, normalized URL and request mode.
//! - Fragments are stripped so `/#a` and `/#b` share one cache entry.
//!
//! ### Fetcher
//! - `Fetcher` is the seam between strategies and the network; tests swap in
//!   a scripted implementation.
//! - `HttpFetcher` uses reqwest with rustls, compression, bounded redirects
//!   (default 5), a request timeout and a body size limit (default 5MB).
//! - Every status is returned as a response. Only transport failures are
//!   errors, which is what lets strategies serve a 404 without caching it.

pub mod request;
pub mod response;
pub mod url;

use bytes::Bytes;
use reqwest::{Client, header};
use std::time::{Duration, Instant};

pub use request::{FetchRequest, RequestMode};
pub use response::{Response, ResponseSource};
pub use url::{UrlError, canonicalize, is_http};

use pwacache_core::{AppConfig, Error};

/// Network transport used by the strategies.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Perform the request. Any HTTP status is `Ok`.
    async fn fetch(&self, request: &FetchRequest) -> Result<Response, Error>;
}

/// Configuration for the HTTP fetcher.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "pwacache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "pwacache/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// reqwest-backed fetcher.
pub struct HttpFetcher {
    http: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<Response, Error> {
        let start = Instant::now();

        let response = self
            .http
            .request(request.method.clone(), request.url.as_str())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::FetchTimeout(format!("{}: {}", request.url, e))
                } else {
                    Error::Network(format!("{}: {}", request.url, e))
                }
            })?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let status = response.status();
        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let body: Bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response: {}", e)))?;

        if body.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", body.len(), self.config.max_bytes)));
        }

        tracing::debug!(
            "fetched {} {} -> {} {} in {}ms ({} bytes, {})",
            request.method,
            request.url,
            final_url,
            status.as_u16(),
            start.elapsed().as_millis(),
            body.len(),
            headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()).unwrap_or("-")
        );

        Ok(Response { status, headers, body, url: Some(final_url), source: ResponseSource::Network })
    }
}
