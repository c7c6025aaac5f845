//! cache_get tool implementation.
//!
//! Looks a URL up across every cache generation without touching the network.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::canonicalize;
use swcache_core::{CacheDb, Error, Request, WorkerConfig};

use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Absolute URL, or a path relative to the worker scope.
    pub url: String,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    pub bytes: usize,
    pub body: String,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(cache: &CacheDb, config: &WorkerConfig, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let url = canonicalize(&params.url, &config.scope).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let request = Request::get(url);

    let response = cache
        .match_any(&request)
        .await?
        .ok_or_else(|| Error::CacheMiss(request.url.to_string()))?;

    json_result(&CacheGetOutput {
        url: request.url.to_string(),
        status: response.status,
        content_type: response.content_type().map(str::to_string),
        bytes: response.body.len(),
        body: String::from_utf8_lossy(&response.body).into_owned(),
        headers: response.headers,
    })
}
