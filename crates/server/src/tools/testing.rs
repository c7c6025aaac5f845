//! Shared fixtures for tool tests: an in-memory cache storage and a
//! scripted network behind a real registration.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use rmcp::model::CallToolResult;
use serde::de::DeserializeOwned;
use swcache_core::{CacheDb, Error, FetchInterceptor, Network, Registration, Request, Response, WorkerConfig};
use url::Url;

pub const SCOPE: &str = "http://localhost:8080/";

#[derive(Default)]
pub struct StubNetwork {
    routes: Mutex<HashMap<String, (u16, &'static str)>>,
    offline: AtomicBool,
}

impl StubNetwork {
    pub fn route(&self, url: &str, status: u16, body: &'static str) {
        self.routes.lock().unwrap().insert(url.to_string(), (status, body));
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

#[async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("offline: {}", request.url)));
        }
        let (status, body) = self
            .routes
            .lock()
            .unwrap()
            .get(request.url.as_str())
            .copied()
            .unwrap_or((404, "not found"));
        Ok(Response::new(request.url.clone(), status, body).with_header("content-type", "text/plain"))
    }
}

pub fn stub_network() -> Arc<StubNetwork> {
    let network = Arc::new(StubNetwork::default());
    network.route("http://localhost:8080/", 200, "<html>root</html>");
    network.route("http://localhost:8080/index.html", 200, "<html>app</html>");
    network
}

pub async fn registration_with(network: Arc<StubNetwork>) -> Arc<Registration<FetchInterceptor>> {
    let db = CacheDb::open_in_memory().await.unwrap();
    let config = WorkerConfig {
        cache_name: "budget-pwa-v1".into(),
        scope: Url::parse(SCOPE).unwrap(),
        precache: vec!["./".into(), "./index.html".into()],
        entry_document: "./index.html".into(),
    };
    let worker = FetchInterceptor::new(config, db, network.clone());
    Arc::new(Registration::new(worker, network))
}

pub async fn registration() -> Arc<Registration<FetchInterceptor>> {
    registration_with(stub_network()).await
}

/// Decode the JSON text content of a tool result.
pub fn output<T: DeserializeOwned>(result: &CallToolResult) -> T {
    let content_val = serde_json::to_value(&result.content[0]).unwrap();
    let text = content_val
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
