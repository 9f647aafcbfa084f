//! Intercepted request model.

use std::fmt;
use std::str::FromStr;

use pwacache_core::{AppConfig, Error, cache::hash::compute_cache_key};
use reqwest::{Method, Url};

use super::url::{canonicalize, is_http};

/// How the page issued the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
    /// Full document load.
    Navigate,
    SameOrigin,
    #[default]
    NoCors,
    Cors,
}

impl RequestMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestMode::Navigate => "navigate",
            RequestMode::SameOrigin => "same-origin",
            RequestMode::NoCors => "no-cors",
            RequestMode::Cors => "cors",
        }
    }
}

impl fmt::Display for RequestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "navigate" => Ok(RequestMode::Navigate),
            "same-origin" => Ok(RequestMode::SameOrigin),
            "no-cors" => Ok(RequestMode::NoCors),
            "cors" => Ok(RequestMode::Cors),
            other => Err(Error::InvalidInput(format!("unknown request mode: {other}"))),
        }
    }
}

/// A request offered to the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub method: Method,
    pub url: Url,
    pub mode: RequestMode,
}

impl FetchRequest {
    pub fn new(method: Method, url: Url, mode: RequestMode) -> Self {
        Self { method, url, mode }
    }

    /// A plain `GET` subresource request.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url, RequestMode::NoCors)
    }

    /// A `GET` page load.
    pub fn navigate(url: Url) -> Self {
        Self::new(Method::GET, url, RequestMode::Navigate)
    }

    /// Build a request from untyped parts, normalizing the URL.
    pub fn parse(method: &str, url: &str, mode: &str) -> Result<Self, Error> {
        let method = Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {method:?}: {e}")))?;
        let url = canonicalize(url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self::new(method, url, mode.parse()?))
    }

    /// Request identity used as the cache key.
    pub fn cache_key(&self) -> String {
        compute_cache_key(self.method.as_str(), self.url.as_str())
    }

    /// Whether the worker handles this request at all.
    ///
    /// Non-`GET` methods and non-http(s) schemes always go straight to the
    /// network. With `restrict_origin`, cross-origin requests are only
    /// handled for hosts in `allowed_hosts`.
    pub fn is_interceptable(&self, config: &AppConfig) -> bool {
        if self.method != Method::GET || !is_http(&self.url) {
            return false;
        }
        if !config.restrict_origin || self.url.origin() == config.scope.origin() {
            return true;
        }
        let host = self.url.host_str().unwrap_or_default();
        config.allowed_hosts.iter().any(|allowed| host.contains(allowed.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig {
            scope: Url::parse("https://quotle.example/").unwrap(),
            allowed_hosts: vec!["fonts.googleapis.com".into(), "fonts.gstatic.com".into()],
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_request() {
        let req = FetchRequest::parse("get", " https://quotle.example/app.js#x ", "navigate").unwrap();
        assert_eq!(req.method, Method::GET);
        assert_eq!(req.url.as_str(), "https://quotle.example/app.js");
        assert_eq!(req.mode, RequestMode::Navigate);
    }

    #[test]
    fn test_parse_rejects_unknown_mode() {
        let result = FetchRequest::parse("GET", "https://quotle.example/", "websocket");
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_cache_key_ignores_mode() {
        let url = Url::parse("https://quotle.example/").unwrap();
        assert_eq!(FetchRequest::get(url.clone()).cache_key(), FetchRequest::navigate(url).cache_key());
    }

    #[test]
    fn test_non_get_not_intercepted() {
        let config = config();
        for method in [Method::POST, Method::PUT, Method::DELETE, Method::HEAD] {
            let req = FetchRequest::new(method, Url::parse("https://quotle.example/api").unwrap(), RequestMode::Cors);
            assert!(!req.is_interceptable(&config));
        }
    }

    #[test]
    fn test_non_http_not_intercepted() {
        let req = FetchRequest::get(Url::parse("chrome-extension://abc/content.js").unwrap());
        assert!(!req.is_interceptable(&config()));
    }

    #[test]
    fn test_origin_rules() {
        let config = config();
        let same = FetchRequest::get(Url::parse("https://quotle.example/index.html").unwrap());
        let font = FetchRequest::get(Url::parse("https://fonts.gstatic.com/s/inter.woff2").unwrap());
        let other = FetchRequest::get(Url::parse("https://cdn.other.example/lib.js").unwrap());

        assert!(same.is_interceptable(&config));
        assert!(font.is_interceptable(&config));
        assert!(!other.is_interceptable(&config));

        let open = AppConfig { restrict_origin: false, ..config };
        assert!(other.is_interceptable(&open));
    }
}
