//! Worker registration: drives install/activate the way a browser would
//! and decides whether fetches reach the worker at all.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use super::{ActivateReport, FetchOutcome, InstallReport, Network, PriorInstall, WorkerHandler, WorkerHost};
use crate::{Error, Request};

/// Lifecycle state of the registered worker version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    /// Install failed; this version will never control clients.
    Redundant,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`Registration::install`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct InstallOutcome {
    pub install: InstallReport,
    /// Present when activation ran straight after install.
    pub activation: Option<ActivateReport>,
}

/// A registered worker and the runtime state around it.
///
/// Lifecycle transitions are serialized; fetches run concurrently and
/// only reach the worker once a version has activated.
pub struct Registration<W> {
    worker: W,
    network: Arc<dyn Network>,
    state: RwLock<WorkerState>,
    transition: Mutex<()>,
    skip_waiting: AtomicBool,
    clients_claimed: AtomicBool,
    active: AtomicBool,
}

impl<W: WorkerHandler> Registration<W> {
    pub fn new(worker: W, network: Arc<dyn Network>) -> Self {
        Self {
            worker,
            network,
            state: RwLock::new(WorkerState::Parsed),
            transition: Mutex::new(()),
            skip_waiting: AtomicBool::new(false),
            clients_claimed: AtomicBool::new(false),
            active: AtomicBool::new(false),
        }
    }

    pub fn worker(&self) -> &W {
        &self.worker
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    /// Whether some version is controlling fetches.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn clients_claimed(&self) -> bool {
        self.clients_claimed.load(Ordering::SeqCst)
    }

    async fn set_state(&self, state: WorkerState) {
        *self.state.write().await = state;
    }

    /// Pick up what an earlier run installed, as a browser keeps the active
    /// worker across restarts.
    ///
    /// With [`PriorInstall::Current`] this version is activated straight
    /// away. With [`PriorInstall::Previous`] the older generation controls
    /// fetches while this version still needs [`Registration::install`];
    /// if that install fails the older generation keeps serving.
    pub async fn resume(&self) -> Result<PriorInstall, Error> {
        let _guard = self.transition.lock().await;

        let state = self.state().await;
        if state != WorkerState::Parsed {
            return Err(Error::InvalidState(format!("cannot resume a worker that is {state}")));
        }

        let prior = self.worker.resume().await?;
        match &prior {
            PriorInstall::Current => {
                self.active.store(true, Ordering::SeqCst);
                self.set_state(WorkerState::Activated).await;
                tracing::info!("resumed previously installed worker");
            }
            PriorInstall::Previous(cache_name) => {
                self.active.store(true, Ordering::SeqCst);
                tracing::info!(cache_name = %cache_name, "previous generation serving until install succeeds");
            }
            PriorInstall::None => {}
        }

        Ok(prior)
    }

    /// Run the install handler. Activation follows immediately when the
    /// handler asked to skip waiting or no version is active yet.
    ///
    /// # Errors
    ///
    /// A failed install leaves this version `redundant`; a version that was
    /// already active keeps serving fetches.
    pub async fn install(&self) -> Result<InstallOutcome, Error> {
        let _guard = self.transition.lock().await;

        self.skip_waiting.store(false, Ordering::SeqCst);
        self.set_state(WorkerState::Installing).await;
        tracing::info!("installing worker");

        let install = match self.worker.on_install(self).await {
            Ok(report) => report,
            Err(e) => {
                self.set_state(WorkerState::Redundant).await;
                tracing::warn!(error = %e, still_active = self.is_active(), "install failed");
                return Err(e);
            }
        };
        self.set_state(WorkerState::Installed).await;

        let activation = if self.skip_waiting.load(Ordering::SeqCst) || !self.is_active() {
            Some(self.activate_locked().await?)
        } else {
            tracing::info!("installed; waiting for activation");
            None
        };

        Ok(InstallOutcome { install, activation })
    }

    /// Activate an installed version that is waiting.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        let _guard = self.transition.lock().await;
        self.activate_locked().await
    }

    async fn activate_locked(&self) -> Result<ActivateReport, Error> {
        let state = self.state().await;
        if state != WorkerState::Installed {
            return Err(Error::InvalidState(format!("cannot activate a worker that is {state}")));
        }

        self.set_state(WorkerState::Activating).await;
        match self.worker.on_activate(self).await {
            Ok(report) => {
                self.active.store(true, Ordering::SeqCst);
                self.set_state(WorkerState::Activated).await;
                tracing::info!(deleted = report.deleted.len(), "worker activated");
                Ok(report)
            }
            Err(e) => {
                self.set_state(WorkerState::Installed).await;
                tracing::warn!(error = %e, "activate failed");
                Err(e)
            }
        }
    }

    /// Dispatch a fetch event from a client page.
    pub async fn fetch(&self, request: &Request) -> Result<FetchOutcome, Error> {
        if self.is_active()
            && let Some(outcome) = self.worker.on_fetch(request).await?
        {
            return Ok(outcome);
        }

        let response = self.network.fetch(request).await?;
        Ok(FetchOutcome::passthrough(response))
    }
}

impl<W: WorkerHandler> WorkerHost for Registration<W> {
    fn skip_waiting(&self) {
        self.skip_waiting.store(true, Ordering::SeqCst);
    }

    fn claim_clients(&self) {
        self.clients_claimed.store(true, Ordering::SeqCst);
    }
}
