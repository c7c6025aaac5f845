//! cache_delete tool implementation.
//!
//! Deletes a whole cache generation. Individual entries are never evicted.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{CacheDb, Error};

use crate::tools::json_result;

/// Parameters for the cache_delete tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheDeleteParams {
    /// Name of the cache generation to delete.
    pub name: String,
}

/// Output from the cache_delete tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheDeleteOutput {
    pub name: String,
    pub deleted: bool,
}

/// Implementation of the cache_delete tool.
pub async fn delete_impl(cache: &CacheDb, params: CacheDeleteParams) -> Result<CallToolResult, McpError> {
    if params.name.trim().is_empty() {
        return Err(Error::InvalidInput("name cannot be empty".to_string()).into());
    }

    if !cache.delete_cache(&params.name).await? {
        return Err(Error::CacheMiss(params.name).into());
    }

    tracing::info!(cache_name = %params.name, "cache generation deleted");
    json_result(&CacheDeleteOutput { name: params.name, deleted: true })
}
