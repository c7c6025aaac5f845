//! cache_keys tool implementation.
//!
//! Lists every cache generation with the request URLs it stores.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{CacheDb, WorkerConfig};

use crate::tools::json_result;

/// One cache generation in the cache_keys output.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListing {
    pub name: String,
    pub created_at: String,
    /// Whether this is the worker's current generation.
    pub current: bool,
    pub entries: Vec<String>,
}

/// Output from the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysOutput {
    pub caches: Vec<CacheListing>,
}

/// Implementation of the cache_keys tool.
pub async fn keys_impl(cache: &CacheDb, config: &WorkerConfig) -> Result<CallToolResult, McpError> {
    let mut caches = Vec::new();
    for summary in cache.summaries().await? {
        // deleted since the summary was read
        let Some(entries) = cache.keys_by_name(&summary.name).await? else {
            continue;
        };
        caches.push(CacheListing {
            current: summary.name == config.cache_name,
            name: summary.name,
            created_at: summary.created_at,
            entries,
        });
    }

    json_result(&CacheKeysOutput { caches })
}
