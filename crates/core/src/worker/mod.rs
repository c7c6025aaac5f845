//! Fetch interception for an offline-capable single-page application.
//!
//! The worker owns one cache generation, a precache list, and three
//! handlers:
//!
//! - **install**: precache the core assets into the current generation
//! - **activate**: evict every other generation and claim clients
//! - **fetch**: route each GET request to a caching strategy
//!
//! | Request          | Strategy                                   |
//! |------------------|--------------------------------------------|
//! | navigation       | entry document from cache, else network    |
//! | same-origin      | cache-first, revalidate in the background  |
//! | cross-origin     | network-first, cache as fallback           |
//! | non-GET          | not intercepted                            |
//!
//! The hosting runtime ([`WorkerHost`]) and the transport ([`Network`])
//! are trait objects so both can be swapped for mocks.

mod interceptor;
mod lifecycle;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use url::Url;

use crate::{Error, Request, Response};

pub use interceptor::FetchInterceptor;
pub use lifecycle::{InstallOutcome, Registration, WorkerState};

/// Network transport used for live fetches.
#[async_trait]
pub trait Network: Send + Sync {
    /// Perform `request`. Any HTTP status is a successful fetch;
    /// only transport failures are errors.
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

/// Runtime hooks available to lifecycle handlers.
pub trait WorkerHost: Send + Sync {
    /// Activate as soon as install completes instead of waiting for old clients to close.
    fn skip_waiting(&self);

    /// Start controlling already-open clients without a reload.
    fn claim_clients(&self);
}

/// Event handlers a worker registers with its host.
#[async_trait]
pub trait WorkerHandler: Send + Sync {
    async fn on_install(&self, host: &dyn WorkerHost) -> Result<InstallReport, Error>;

    /// Pick up what an earlier run left in storage. Called once, before
    /// any install.
    async fn resume(&self) -> Result<PriorInstall, Error> {
        Ok(PriorInstall::None)
    }

    async fn on_activate(&self, host: &dyn WorkerHost) -> Result<ActivateReport, Error>;

    /// Returns `Ok(None)` when the request is not intercepted and should
    /// go to the network untouched.
    async fn on_fetch(&self, request: &Request) -> Result<Option<FetchOutcome>, Error>;
}

/// What [`WorkerHandler::resume`] found in storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriorInstall {
    /// Nothing to serve from until an install succeeds.
    None,
    /// An older generation that keeps serving until this version installs.
    Previous(String),
    /// This version's own generation.
    Current,
}

/// Worker settings passed explicitly to every handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Current cache generation.
    pub cache_name: String,
    /// Application base URL.
    pub scope: Url,
    /// Paths precached on install, relative to `scope`.
    pub precache: Vec<String>,
    /// Document served for navigations, relative to `scope`.
    pub entry_document: String,
}

impl WorkerConfig {
    /// Resolve a path against the scope.
    pub fn resolve(&self, path: &str) -> Result<Url, Error> {
        self.scope
            .join(path)
            .map_err(|e| Error::InvalidUrl(format!("{path}: {e}")))
    }

    /// GET requests for the precache list, in declaration order.
    pub fn precache_requests(&self) -> Result<Vec<Request>, Error> {
        self.precache.iter().map(|path| self.resolve(path).map(Request::get)).collect()
    }

    /// GET request for the entry document.
    pub fn entry_request(&self) -> Result<Request, Error> {
        self.resolve(&self.entry_document).map(Request::get)
    }

    pub fn is_same_origin(&self, url: &Url) -> bool {
        url.origin() == self.scope.origin()
    }
}

/// Which branch of the fetch handler served a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Navigation,
    SameOrigin,
    CrossOrigin,
}

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Cache,
    Network,
    /// Not intercepted; fetched from the network as-is.
    Passthrough,
}

/// Result of an intercepted or passed-through fetch.
#[derive(Debug)]
pub struct FetchOutcome {
    pub response: Response,
    pub source: ResponseSource,
    /// `None` for passthrough requests.
    pub kind: Option<RequestKind>,
    /// Background refresh started by a cache-first hit.
    pub revalidation: Option<JoinHandle<()>>,
}

impl FetchOutcome {
    pub(crate) fn new(response: Response, source: ResponseSource, kind: RequestKind) -> Self {
        Self { response, source, kind: Some(kind), revalidation: None }
    }

    pub(crate) fn passthrough(response: Response) -> Self {
        Self { response, source: ResponseSource::Passthrough, kind: None, revalidation: None }
    }

    /// Wait for the background refresh, if one was started.
    pub async fn settle(&mut self) {
        if let Some(handle) = self.revalidation.take()
            && let Err(e) = handle.await
        {
            tracing::warn!(error = %e, "revalidation task failed");
        }
    }
}

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct InstallReport {
    pub cache_name: String,
    /// Precached URLs, in precache-list order.
    pub precached: Vec<String>,
}

/// Result of a successful activate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ActivateReport {
    pub cache_name: String,
    /// Cache generations removed, in creation order.
    pub deleted: Vec<String>,
}
