//! SQLite-backed cache storage for request/response pairs.
//!
//! This module provides persistent, named cache stores using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - One store per cache generation, enumerable in creation order
//! - Request-addressed entries using SHA-256 hashing of method + URL
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//!
//! Entries never expire on their own; a generation is evicted by
//! deleting its whole store.

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod storage;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::Cache;
pub use storage::CacheSummary;
