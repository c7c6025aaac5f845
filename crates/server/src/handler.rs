//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::{
    cache::{CacheDeleteParams, CacheGetParams, delete_impl, get_impl, keys_impl},
    lifecycle::{activate_impl, install_impl, status_impl},
    sw_fetch::{SwFetchParams, fetch_impl},
};

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
use swcache_core::{FetchInterceptor, Registration};

/// The main MCP server handler for sw-cache.
#[derive(Clone)]
pub struct SwCacheServer {
    registration: Arc<Registration<FetchInterceptor>>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl SwCacheServer {
    /// Create a new server handler around a registered worker.
    pub fn new(registration: Arc<Registration<FetchInterceptor>>) -> Self {
        Self { registration, tool_router: Self::tool_router() }
    }

    /// Install the worker: precache the core assets into the current cache generation.
    #[tool(description = "Install the worker: precache core assets into the current cache generation. \
                          Activates immediately afterwards, evicting older generations.")]
    async fn sw_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.registration).await
    }

    /// Activate an installed worker that is waiting.
    #[tool(description = "Activate an installed worker that is waiting. Deletes every cache generation but the current one.")]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.registration).await
    }

    #[tool(description = "Report worker lifecycle state, cache generation and scope.")]
    async fn sw_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.registration).await
    }

    /// Dispatch a fetch event through the worker.
    ///
    /// Navigations get the cached entry document, same-origin assets are
    /// cache-first, cross-origin assets are network-first.
    #[tool(description = "Fetch a URL the way a page controlled by the worker would. \
                          Relative URLs resolve against the scope. Returns status, body and whether it came from cache or network.")]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.registration, params.0).await
    }

    #[tool(description = "List cache generations in creation order with the URLs each one stores.")]
    async fn cache_keys(&self) -> Result<CallToolResult, McpError> {
        keys_impl(self.registration.worker().cache_db(), self.registration.worker().config()).await
    }

    #[tool(description = "Look a URL up across the cache generations without touching the network.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(self.registration.worker().cache_db(), self.registration.worker().config(), params.0).await
    }

    #[tool(description = "Delete a whole cache generation by name.")]
    async fn cache_delete(&self, params: Parameters<CacheDeleteParams>) -> Result<CallToolResult, McpError> {
        delete_impl(self.registration.worker().cache_db(), params.0).await
    }
}

impl ServerHandler for SwCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "sw-cache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::registration;

    #[tokio::test]
    async fn test_tool_router_lists_every_tool() {
        let server = SwCacheServer::new(registration().await);
        let mut names: Vec<String> = server
            .tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect();
        names.sort();

        assert_eq!(
            names,
            vec!["cache_delete", "cache_get", "cache_keys", "sw_activate", "sw_fetch", "sw_install", "sw_status"]
        );
    }
}
