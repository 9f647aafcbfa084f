//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the worker's triggers.
use std::sync::Arc;

use crate::tools::{
    cache::{CacheGetParams, CacheKeysParams, get_impl, keys_impl},
    fetch::{WorkerFetchParams, fetch_impl},
    lifecycle::{
        ClientIdParams, ClientRegisterParams, activate_impl, client_close_impl, install_impl, messages_impl,
        register_impl, status_impl,
    },
    message::{WorkerMessageParams, message_impl},
    push::{NotificationClickParams, NotificationCloseParams, WorkerPushParams, click_impl, close_impl, push_impl},
    sync::{WorkerSyncParams, sync_impl},
};

use pwacache_client::{ClientRegistry, ServiceWorker};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The MCP server handler hosting one service worker.
#[derive(Clone)]
pub struct WorkerHost {
    worker: Arc<ServiceWorker>,
    clients: ClientRegistry,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl WorkerHost {
    /// Create a new server handler around a worker and the registry its clients live in.
    pub fn new(worker: Arc<ServiceWorker>, clients: ClientRegistry) -> Self {
        Self { worker, clients, tool_router: Self::tool_router() }
    }

    #[tool(description = "Install the worker: download every static asset into the current cache generation.")]
    async fn worker_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.worker).await
    }

    #[tool(description = "Activate the worker: delete older cache generations of this app and claim open windows.")]
    async fn worker_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.worker).await
    }

    /// Offer a request to the worker.
    ///
    /// Routed through the strategy table; reports the route, response source and body.
    #[tool(
        description = "Offer a request to the worker. Returns the strategy used, status, response source and body, or intercepted=false."
    )]
    async fn worker_fetch(&self, params: Parameters<WorkerFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, params.0).await
    }

    #[tool(description = "Post a message to the worker (SKIP_WAITING, GET_VERSION, CLEAR_CACHE). Returns the reply, if any.")]
    async fn worker_message(&self, params: Parameters<WorkerMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.worker, params.0).await
    }

    #[tool(description = "Deliver a push payload. Returns the notification the worker would show.")]
    async fn worker_push(&self, params: Parameters<WorkerPushParams>) -> Result<CallToolResult, McpError> {
        push_impl(&self.worker, params.0)
    }

    #[tool(description = "Click a notification or one of its actions. Focuses an app window or opens one at the deep link.")]
    async fn worker_notification_click(
        &self, params: Parameters<NotificationClickParams>,
    ) -> Result<CallToolResult, McpError> {
        click_impl(&self.worker, params.0).await
    }

    #[tool(description = "Dismiss a notification without clicking it.")]
    async fn worker_notification_close(
        &self, params: Parameters<NotificationCloseParams>,
    ) -> Result<CallToolResult, McpError> {
        close_impl(&self.worker, params.0)
    }

    #[tool(description = "Fire a background sync (or periodic sync) by tag.")]
    async fn worker_sync(&self, params: Parameters<WorkerSyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(&self.worker, params.0).await
    }

    #[tool(description = "Report the worker version, lifecycle state, cache buckets and open windows.")]
    async fn worker_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.worker, &self.clients).await
    }

    #[tool(description = "Register a page opened by the user so the worker can claim and focus it.")]
    async fn client_register(&self, params: Parameters<ClientRegisterParams>) -> Result<CallToolResult, McpError> {
        register_impl(&self.clients, params.0).await
    }

    #[tool(description = "Read and clear the messages the worker posted to a window, such as notification clicks.")]
    async fn client_messages(&self, params: Parameters<ClientIdParams>) -> Result<CallToolResult, McpError> {
        messages_impl(&self.clients, params.0).await
    }

    #[tool(description = "Close a window so the worker stops tracking it.")]
    async fn client_close(&self, params: Parameters<ClientIdParams>) -> Result<CallToolResult, McpError> {
        client_close_impl(&self.clients, params.0).await
    }

    #[tool(description = "Read the stored response for a request from the cache.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(self.worker.storage(), self.worker.config(), params.0).await
    }

    #[tool(description = "List cache buckets and the request URLs stored in each.")]
    async fn cache_keys(&self, params: Parameters<CacheKeysParams>) -> Result<CallToolResult, McpError> {
        keys_impl(self.worker.storage(), params.0).await
    }
}

impl ServerHandler for WorkerHost {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "pwacache-host".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(format!(
                "Offline cache worker for {}. Call worker_install, then worker_activate, then worker_fetch.",
                self.worker.config().cache_name()
            )),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
