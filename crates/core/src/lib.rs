//! Core types and shared functionality for sw-cache.
//!
//! This crate provides:
//! - Cache storage with SQLite backend (named, versioned cache stores)
//! - Request/response model shared by the interceptor and the transport
//! - The fetch interceptor and its install/activate lifecycle
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod request;
pub mod worker;

pub use cache::{Cache, CacheDb};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use request::{Request, RequestMode, Response};
pub use worker::{
    ActivateReport, FetchInterceptor, FetchOutcome, InstallOutcome, InstallReport, Network, PriorInstall, Registration,
    RequestKind, ResponseSource, WorkerConfig, WorkerHandler, WorkerHost, WorkerState,
};
