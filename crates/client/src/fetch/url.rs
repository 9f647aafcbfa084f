//! Request URL normalization for consistent cache keys.

/// Error type for URL normalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Normalize a request URL so equal resources share one cache key.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to https:// if missing
/// 3. Remove fragment (#...), which never reaches the network
/// 4. Keep query string intact (do not reorder)
///
/// Any scheme is accepted; deciding whether to intercept a non-http(s)
/// request is up to the router. Host case folding for http(s) is done by
/// the parser.
pub fn canonicalize(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains(':') && url::Url::parse(trimmed).is_ok() {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let mut parsed = url::Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    parsed.set_fragment(None);

    Ok(parsed)
}

/// Whether the scheme is one the worker may intercept.
pub fn is_http(url: &url::Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}
