//! Network transport for sw-cache.
//!
//! This crate provides the HTTP implementation of the worker's `Network`
//! trait and URL canonicalization relative to the worker scope.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig, UrlError, canonicalize};
