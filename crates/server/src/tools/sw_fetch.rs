//! sw_fetch tool implementation.
//!
//! Dispatches a fetch event through the registered worker, exactly as a
//! controlled page would issue it.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::canonicalize;
use swcache_core::{Error, FetchInterceptor, Registration, Request, RequestKind, RequestMode, ResponseSource};

use super::json_result;

/// Input parameters for sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL, or a path relative to the worker scope (e.g. "./app.js").
    pub url: String,

    /// HTTP method (default: GET). Only GET requests are intercepted.
    #[serde(default = "default_method")]
    pub method: String,

    /// Request mode: "navigate" for a document load, otherwise "cors" (default),
    /// "no-cors" or "same-origin".
    #[serde(default)]
    pub mode: RequestMode,

    /// Optional request body, forwarded unmodified.
    #[serde(default)]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    /// The canonical request URL.
    pub url: String,
    /// URL the response was served from.
    pub response_url: String,
    pub method: String,
    pub status: u16,
    /// "cache", "network" or "passthrough".
    pub source: ResponseSource,
    /// Strategy that served the request; absent when not intercepted.
    pub kind: Option<RequestKind>,
    pub content_type: Option<String>,
    /// Body length in bytes.
    pub bytes: usize,
    /// Body decoded as UTF-8 (lossy).
    pub body: String,
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(
    registration: &Registration<FetchInterceptor>, params: SwFetchParams,
) -> Result<CallToolResult, McpError> {
    if params.method.trim().is_empty() {
        return Err(Error::InvalidInput("method cannot be empty".into()).into());
    }

    let scope = &registration.worker().config().scope;
    let url = canonicalize(&params.url, scope).map_err(|e| Error::InvalidUrl(e.to_string()))?;

    let mut request = Request::new(&params.method, url, params.mode);
    if let Some(body) = params.body {
        request = request.with_body(body);
    }

    let outcome = registration.fetch(&request).await?;
    let response = outcome.response;

    let output = SwFetchOutput {
        url: request.url.to_string(),
        response_url: response.url.to_string(),
        method: request.method,
        status: response.status,
        source: outcome.source,
        kind: outcome.kind,
        content_type: response.content_type().map(str::to_string),
        bytes: response.body.len(),
        body: String::from_utf8_lossy(&response.body).into_owned(),
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{output, registration, registration_with, stub_network};

    fn params(url: &str) -> SwFetchParams {
        SwFetchParams { url: url.into(), method: default_method(), mode: RequestMode::Cors, body: None }
    }

    #[tokio::test]
    async fn test_fetch_empty_url() {
        let registration = registration().await;
        let result = fetch_impl(&registration, params("")).await;
        assert_eq!(result.unwrap_err().code.0, -32003);
    }

    #[tokio::test]
    async fn test_fetch_passthrough_before_install() {
        let registration = registration().await;
        let result = fetch_impl(&registration, params("./index.html")).await.unwrap();
        let fetched: SwFetchOutput = output(&result);

        assert_eq!(fetched.source, ResponseSource::Passthrough);
        assert_eq!(fetched.kind, None);
        assert_eq!(fetched.body, "<html>app</html>");
    }

    #[tokio::test]
    async fn test_offline_navigation_after_install() {
        let network = stub_network();
        let registration = registration_with(network.clone()).await;
        registration.install().await.unwrap();
        network.set_offline(true);

        let navigate = SwFetchParams { mode: RequestMode::Navigate, ..params("./budgets/2024") };
        let result = fetch_impl(&registration, navigate).await.unwrap();
        let fetched: SwFetchOutput = output(&result);

        assert_eq!(fetched.url, "http://localhost:8080/budgets/2024");
        assert_eq!(fetched.source, ResponseSource::Cache);
        assert_eq!(fetched.kind, Some(RequestKind::Navigation));
        assert_eq!(fetched.body, "<html>app</html>");
        assert_eq!(fetched.content_type.as_deref(), Some("text/plain"));
    }

    #[tokio::test]
    async fn test_post_is_not_intercepted() {
        let network = stub_network();
        network.route("http://localhost:8080/api/sync", 201, "created");
        let registration = registration_with(network).await;
        registration.install().await.unwrap();

        let post = SwFetchParams { method: "post".into(), body: Some("{}".into()), ..params("./api/sync") };
        let result = fetch_impl(&registration, post).await.unwrap();
        let fetched: SwFetchOutput = output(&result);

        assert_eq!(fetched.method, "POST");
        assert_eq!(fetched.status, 201);
        assert_eq!(fetched.source, ResponseSource::Passthrough);
    }

    #[tokio::test]
    async fn test_offline_cross_origin_miss_is_network_error() {
        let network = stub_network();
        let registration = registration_with(network.clone()).await;
        registration.install().await.unwrap();
        network.set_offline(true);

        let result = fetch_impl(&registration, params("https://cdn.example/react.js")).await;
        assert_eq!(result.unwrap_err().code.0, -32008);
    }
}
