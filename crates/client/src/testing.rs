//! Scripted network for strategy and worker tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use pwacache_core::Error;
use reqwest::StatusCode;
use reqwest::header::{self, HeaderMap, HeaderValue};

use crate::fetch::{FetchRequest, Fetcher, Response, ResponseSource};

#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Status(u16, &'static str),
    Delayed(Duration, u16, &'static str),
    /// Transport failure.
    Fail,
    /// Never settles.
    Hang,
}

/// Answers by exact URL; unknown URLs fail like an unreachable host.
#[derive(Default)]
pub(crate) struct ScriptedFetcher {
    replies: Mutex<HashMap<String, Reply>>,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn on(&self, url: &str, reply: Reply) {
        self.replies.lock().unwrap().insert(url.to_string(), reply);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn respond(request: &FetchRequest, status: u16, body: &'static str) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    Response {
        status: StatusCode::from_u16(status).unwrap(),
        headers,
        body: Bytes::from_static(body.as_bytes()),
        url: Some(request.url.clone()),
        source: ResponseSource::Network,
    }
}

#[async_trait::async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<Response, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.replies.lock().unwrap().get(request.url.as_str()).cloned();

        match reply {
            Some(Reply::Status(status, body)) => Ok(respond(request, status, body)),
            Some(Reply::Delayed(delay, status, body)) => {
                tokio::time::sleep(delay).await;
                Ok(respond(request, status, body))
            }
            Some(Reply::Hang) => std::future::pending().await,
            Some(Reply::Fail) | None => Err(Error::Network(format!("{}: connection refused", request.url))),
        }
    }
}
