//! Responses produced by the worker.

use bytes::Bytes;
use pwacache_core::CachedEntry;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{StatusCode, Url};
use serde::Serialize;

use super::request::FetchRequest;

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseSource {
    Network,
    Cache,
    OfflineDocument,
    /// Built by the worker, e.g. the 503 "Offline" fallback.
    Synthetic,
}

/// Response snapshot returned to the page.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// URL the body was fetched from, if any.
    pub url: Option<Url>,
    pub source: ResponseSource,
}

impl Response {
    /// The synthetic 503 served when neither network nor cache can answer.
    pub fn offline() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            headers,
            body: Bytes::from_static(b"Offline"),
            url: None,
            source: ResponseSource::Synthetic,
        }
    }

    /// Rebuild a response from a stored entry. Unparseable headers are dropped.
    pub fn from_entry(entry: CachedEntry, source: ResponseSource) -> Self {
        let mut headers = HeaderMap::new();
        for (name, value) in &entry.headers {
            if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
                headers.append(name, value);
            }
        }

        Self {
            status: StatusCode::from_u16(entry.status).unwrap_or(StatusCode::OK),
            headers,
            body: Bytes::from(entry.body),
            url: Url::parse(&entry.url).ok(),
            source,
        }
    }

    /// Snapshot this response for `bucket`, keyed by `request`.
    pub fn to_entry(&self, bucket: &str, request: &FetchRequest) -> CachedEntry {
        let headers = self
            .headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        CachedEntry::new(
            bucket,
            request.method.as_str(),
            request.url.as_str(),
            self.status.as_u16(),
            headers,
            self.body.to_vec(),
        )
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }
}
