//! worker_push, worker_notification_click and worker_notification_close tools.

use pwacache_client::{ClickOutcome, Notification, NotificationClick, ServiceWorker};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::json_result;

/// Parameters for the worker_push tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerPushParams {
    /// Raw push payload text, normally a JSON object. Omit for an empty push.
    #[serde(default)]
    pub payload: Option<String>,
}

/// Parameters for the worker_notification_click tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NotificationClickParams {
    /// Action button code; empty for a click on the notification body.
    #[serde(default)]
    pub action: String,

    /// The clicked notification's `data`.
    #[serde(default)]
    pub data: Value,
}

/// Parameters for the worker_notification_close tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NotificationCloseParams {
    /// Tag of the dismissed notification.
    pub tag: String,
}

/// Output from the worker_push tool.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerPushOutput {
    pub notification: Notification,
}

pub fn push_impl(worker: &ServiceWorker, params: WorkerPushParams) -> Result<CallToolResult, McpError> {
    let notification = worker.on_push(params.payload.as_deref());
    json_result(&WorkerPushOutput { notification })
}

pub async fn click_impl(worker: &ServiceWorker, params: NotificationClickParams) -> Result<CallToolResult, McpError> {
    let click = NotificationClick { action: params.action, data: params.data };
    let outcome: ClickOutcome = worker.on_notification_click(&click).await?;
    json_result(&outcome)
}

pub fn close_impl(worker: &ServiceWorker, params: NotificationCloseParams) -> Result<CallToolResult, McpError> {
    worker.on_notification_close(&params.tag);
    json_result(&serde_json::json!({ "closed": params.tag }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{assets, output, worker};
    use pwacache_client::Clients;
    use serde_json::json;

    #[tokio::test]
    async fn test_push_streak_reminder() {
        let (worker, _clients) = worker(assets()).await;
        let payload = r#"{"title":"Keep it going","type":"streak-reminder","data":{"url":"/?tab=stats"}}"#;

        let out: Value = output(&push_impl(&worker, WorkerPushParams { payload: Some(payload.into()) }).unwrap());
        let notification = &out["notification"];
        assert_eq!(notification["title"], "Keep it going");
        assert_eq!(notification["requireInteraction"], true);
        assert_eq!(notification["actions"][1]["action"], "snooze");
        assert_eq!(notification["data"]["url"], "/?tab=stats");
    }

    #[tokio::test]
    async fn test_empty_push_uses_defaults() {
        let (worker, _clients) = worker(assets()).await;
        let out: Value = output(&push_impl(&worker, WorkerPushParams { payload: None }).unwrap());
        assert_eq!(out["notification"]["title"], "Notification");
        assert_eq!(out["notification"]["tag"], "default");
    }

    #[tokio::test]
    async fn test_click_opens_window_when_none_match() {
        let (worker, clients) = worker(assets()).await;
        let params = NotificationClickParams { action: "log".into(), data: Value::Null };

        let out: Value = output(&click_impl(&worker, params).await.unwrap());
        assert_eq!(out["outcome"], "opened");
        assert_eq!(out["client"]["url"], "https://quotle.example/?action=log");
        assert_eq!(clients.match_all().await.len(), 1);
    }

    #[tokio::test]
    async fn test_click_dismiss_closes() {
        let (worker, _clients) = worker(assets()).await;
        let params = NotificationClickParams { action: "dismiss".into(), data: json!({"url": "/"}) };
        let out: Value = output(&click_impl(&worker, params).await.unwrap());
        assert_eq!(out, json!({"outcome": "closed"}));
    }

    #[tokio::test]
    async fn test_close_is_acknowledged() {
        let (worker, _clients) = worker(assets()).await;
        let out: Value = output(&close_impl(&worker, NotificationCloseParams { tag: "default".into() }).unwrap());
        assert_eq!(out, json!({"closed": "default"}));
    }
}
