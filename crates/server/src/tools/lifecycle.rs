//! sw_install, sw_activate and sw_status tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{ActivateReport, FetchInterceptor, InstallOutcome, Registration, WorkerState};

use super::json_result;

/// Output from the sw_install tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InstallOutput {
    #[serde(flatten)]
    pub outcome: InstallOutcome,
    /// Lifecycle state after the call.
    pub state: WorkerState,
}

/// Output from the sw_activate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ActivateOutput {
    #[serde(flatten)]
    pub report: ActivateReport,
    pub state: WorkerState,
}

/// Output from the sw_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StatusOutput {
    pub state: WorkerState,
    /// Whether some version is intercepting fetches.
    pub active: bool,
    pub clients_claimed: bool,
    pub cache_name: String,
    /// Generation receiving runtime writes; differs from `cache_name` until an upgrade activates.
    pub serving_cache: String,
    pub scope: String,
    pub precache: Vec<String>,
}

/// Implementation of the sw_install tool.
pub async fn install_impl(registration: &Registration<FetchInterceptor>) -> Result<CallToolResult, McpError> {
    let outcome = registration.install().await?;
    json_result(&InstallOutput { outcome, state: registration.state().await })
}

/// Implementation of the sw_activate tool.
pub async fn activate_impl(registration: &Registration<FetchInterceptor>) -> Result<CallToolResult, McpError> {
    let report = registration.activate().await?;
    json_result(&ActivateOutput { report, state: registration.state().await })
}

/// Implementation of the sw_status tool.
pub async fn status_impl(registration: &Registration<FetchInterceptor>) -> Result<CallToolResult, McpError> {
    let config = registration.worker().config();
    json_result(&StatusOutput {
        state: registration.state().await,
        active: registration.is_active(),
        clients_claimed: registration.clients_claimed(),
        cache_name: config.cache_name.clone(),
        serving_cache: registration.worker().serving_cache().await,
        scope: config.scope.to_string(),
        precache: config.precache.clone(),
    })
}
