//! The fetch interceptor: precache on install, evict stale generations on
//! activate, and route every GET through one of three caching strategies.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::try_join_all;
use tokio::sync::RwLock;

use super::{
    ActivateReport, FetchOutcome, InstallReport, Network, PriorInstall, RequestKind, ResponseSource, WorkerConfig,
    WorkerHandler, WorkerHost,
};
use crate::{CacheDb, Error, Request, Response};

/// Service worker for an offline-capable single-page application.
#[derive(Clone)]
pub struct FetchInterceptor {
    config: Arc<WorkerConfig>,
    db: CacheDb,
    network: Arc<dyn Network>,
    /// Generation that opportunistic writes go to. Lags behind
    /// `config.cache_name` until this version activates.
    serving: Arc<RwLock<String>>,
}

impl FetchInterceptor {
    pub fn new(config: WorkerConfig, db: CacheDb, network: Arc<dyn Network>) -> Self {
        let serving = Arc::new(RwLock::new(config.cache_name.clone()));
        Self { config: Arc::new(config), db, network, serving }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn cache_db(&self) -> &CacheDb {
        &self.db
    }

    /// Generation currently receiving runtime cache writes.
    pub async fn serving_cache(&self) -> String {
        self.serving.read().await.clone()
    }

    /// Decide which strategy serves `request`. Navigation wins over origin.
    pub fn classify(&self, request: &Request) -> RequestKind {
        if request.is_navigation() {
            RequestKind::Navigation
        } else if self.config.is_same_origin(&request.url) {
            RequestKind::SameOrigin
        } else {
            RequestKind::CrossOrigin
        }
    }

    /// Every navigation resolves to the cached entry document, falling
    /// back to the network (and caching the result) on a miss.
    async fn navigation_fallback(&self) -> Result<FetchOutcome, Error> {
        let entry = self.config.entry_request()?;

        if let Some(cached) = self.db.match_any(&entry).await? {
            tracing::debug!(url = %entry.url, "navigation served from cache");
            return Ok(FetchOutcome::new(cached, ResponseSource::Cache, RequestKind::Navigation));
        }

        let response = self.network.fetch(&entry).await?;
        self.store(&entry, &response).await;
        Ok(FetchOutcome::new(response, ResponseSource::Network, RequestKind::Navigation))
    }

    /// Cached copy first. A hit still refreshes the store in the background.
    async fn cache_first(&self, request: &Request) -> Result<FetchOutcome, Error> {
        if let Some(cached) = self.db.match_any(request).await? {
            tracing::debug!(url = %request.url, "cache hit, revalidating");
            let revalidation = tokio::spawn(self.clone().revalidate(request.clone()));
            return Ok(FetchOutcome {
                revalidation: Some(revalidation),
                ..FetchOutcome::new(cached, ResponseSource::Cache, RequestKind::SameOrigin)
            });
        }

        tracing::debug!(url = %request.url, "cache miss");
        let response = self.network.fetch(request).await?;
        self.store(request, &response).await;
        Ok(FetchOutcome::new(response, ResponseSource::Network, RequestKind::SameOrigin))
    }

    async fn revalidate(self, request: Request) {
        match self.network.fetch(&request).await {
            Ok(response) => self.store(&request, &response).await,
            // the cached copy was already served
            Err(e) => tracing::debug!(url = %request.url, error = %e, "revalidation skipped"),
        }
    }

    /// Live response first; the cache only answers when the network fails.
    async fn network_first(&self, request: &Request) -> Result<FetchOutcome, Error> {
        match self.network.fetch(request).await {
            Ok(response) => {
                self.store(request, &response).await;
                Ok(FetchOutcome::new(response, ResponseSource::Network, RequestKind::CrossOrigin))
            }
            Err(err) => match self.db.match_any(request).await? {
                Some(cached) => {
                    tracing::debug!(url = %request.url, error = %err, "network failed, serving cached copy");
                    Ok(FetchOutcome::new(cached, ResponseSource::Cache, RequestKind::CrossOrigin))
                }
                None => Err(err),
            },
        }
    }

    /// Opportunistic write into the serving generation. Failures are logged only.
    async fn store(&self, request: &Request, response: &Response) {
        if !response.is_cacheable() {
            tracing::debug!(url = %request.url, status = response.status, "response not cached");
            return;
        }

        let cache_name = self.serving_cache().await;
        let result = match self.db.open_cache(&cache_name).await {
            Ok(cache) => cache.put(request, response).await,
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            tracing::warn!(url = %request.url, cache_name = %cache_name, error = %e, "failed to store response");
        }
    }

    async fn precache_one(&self, request: &Request) -> Result<Response, Error> {
        let response = self
            .network
            .fetch(request)
            .await
            .map_err(|e| Error::PrecacheFailed { url: request.url.to_string(), reason: e.to_string() })?;

        if !response.ok() {
            return Err(Error::PrecacheFailed {
                url: request.url.to_string(),
                reason: format!("status {}", response.status),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl WorkerHandler for FetchInterceptor {
    async fn on_install(&self, host: &dyn WorkerHost) -> Result<InstallReport, Error> {
        host.skip_waiting();

        let requests = self.config.precache_requests()?;
        let responses = try_join_all(requests.iter().map(|r| self.precache_one(r))).await?;

        let cache = self.db.open_cache(&self.config.cache_name).await?;
        let precached = requests.iter().map(|r| r.url.to_string()).collect();
        let pairs: Vec<(Request, Response)> = requests.into_iter().zip(responses).collect();
        cache.put_all(&pairs).await?;

        tracing::info!(cache_name = %self.config.cache_name, count = pairs.len(), "precache complete");

        Ok(InstallReport { cache_name: self.config.cache_name.clone(), precached })
    }

    async fn resume(&self) -> Result<PriorInstall, Error> {
        if self.db.has_cache(&self.config.cache_name).await? {
            return Ok(PriorInstall::Current);
        }

        // newest surviving generation belongs to the version being replaced
        match self.db.cache_names().await?.pop() {
            Some(previous) => {
                *self.serving.write().await = previous.clone();
                Ok(PriorInstall::Previous(previous))
            }
            None => Ok(PriorInstall::None),
        }
    }

    async fn on_activate(&self, host: &dyn WorkerHost) -> Result<ActivateReport, Error> {
        let mut deleted = Vec::new();
        for name in self.db.cache_names().await? {
            if name == self.config.cache_name {
                continue;
            }
            if self.db.delete_cache(&name).await? {
                tracing::info!(cache_name = %name, "deleted stale cache generation");
                deleted.push(name);
            }
        }

        *self.serving.write().await = self.config.cache_name.clone();
        host.claim_clients();

        Ok(ActivateReport { cache_name: self.config.cache_name.clone(), deleted })
    }

    async fn on_fetch(&self, request: &Request) -> Result<Option<FetchOutcome>, Error> {
        if !request.is_get() {
            tracing::debug!(method = %request.method, url = %request.url, "not intercepted");
            return Ok(None);
        }

        let outcome = match self.classify(request) {
            RequestKind::Navigation => self.navigation_fallback().await?,
            RequestKind::SameOrigin => self.cache_first(request).await?,
            RequestKind::CrossOrigin => self.network_first(request).await?,
        };

        Ok(Some(outcome))
    }
}
