//! Cache storage operations: open, enumerate, delete and match across
//! the named cache stores.

use super::connection::CacheDb;
use super::entries::{Cache, response_from_row};
use super::hash::request_key;
use crate::{Error, Request, Response};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Name and size of one cache store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CacheSummary {
    pub name: String,
    pub created_at: String,
    pub entry_count: u64,
}

impl CacheDb {
    /// Open the cache store called `name`, creating it if absent.
    pub async fn open_cache(&self, name: &str) -> Result<Cache, Error> {
        let name = name.to_string();
        let created_at = Utc::now().to_rfc3339();
        let lookup = name.clone();
        let id = self
            .conn
            .call(move |conn| -> Result<i64, Error> {
                conn.execute(
                    "INSERT INTO caches (name, created_at) VALUES (?1, ?2) ON CONFLICT(name) DO NOTHING",
                    params![lookup, created_at],
                )?;
                let id = conn.query_row("SELECT id FROM caches WHERE name = ?1", params![lookup], |row| row.get(0))?;
                Ok(id)
            })
            .await
            .map_err(Error::from)?;

        Ok(Cache::new(self.clone(), id, name))
    }

    /// Whether a cache store called `name` exists.
    pub async fn has_cache(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn
                    .query_row("SELECT EXISTS(SELECT 1 FROM caches WHERE name = ?1)", params![name], |row| {
                        row.get(0)
                    })
                    .map_err(Error::from)?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Names of every cache store, in creation order.
    pub async fn cache_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM caches ORDER BY id ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, rusqlite::Error>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete the cache store called `name` together with all its entries.
    ///
    /// Returns false if no such store existed.
    pub async fn delete_cache(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM caches WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Request URLs held by the store called `name`, in insertion order.
    ///
    /// Unlike [`CacheDb::open_cache`] this never creates the store; a missing
    /// store yields `None`.
    pub async fn keys_by_name(&self, name: &str) -> Result<Option<Vec<String>>, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<Option<Vec<String>>, Error> {
                let id: i64 = match conn.query_row("SELECT id FROM caches WHERE name = ?1", params![name], |row| {
                    row.get(0)
                }) {
                    Ok(id) => id,
                    Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                    Err(e) => return Err(e.into()),
                };

                let mut stmt = conn.prepare("SELECT url FROM cache_entries WHERE cache_id = ?1 ORDER BY rowid ASC")?;
                let urls = stmt
                    .query_map(params![id], |row| row.get(0))?
                    .collect::<Result<Vec<String>, rusqlite::Error>>()?;
                Ok(Some(urls))
            })
            .await
            .map_err(Error::from)
    }

    /// Look `request` up in every cache store, oldest store first.
    ///
    /// Non-GET requests never match.
    pub async fn match_any(&self, request: &Request) -> Result<Option<Response>, Error> {
        if !request.is_get() {
            return Ok(None);
        }

        let key_hash = request_key(request);
        self.conn
            .call(move |conn| -> Result<Option<Response>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT e.response_url, e.status_code, e.headers_json, e.body
                    FROM cache_entries e JOIN caches c ON c.id = e.cache_id
                    WHERE e.key_hash = ?1
                    ORDER BY c.id ASC
                    LIMIT 1",
                )?;

                match stmt.query_row(params![key_hash], response_from_row) {
                    Ok(response) => Ok(Some(response)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Every cache store with its entry count, in creation order.
    pub async fn summaries(&self) -> Result<Vec<CacheSummary>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<CacheSummary>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT c.name, c.created_at, COUNT(e.key_hash)
                    FROM caches c LEFT JOIN cache_entries e ON e.cache_id = c.id
                    GROUP BY c.id
                    ORDER BY c.id ASC",
                )?;
                let summaries = stmt
                    .query_map([], |row| {
                        Ok(CacheSummary {
                            name: row.get(0)?,
                            created_at: row.get(1)?,
                            entry_count: row.get::<_, i64>(2)? as u64,
                        })
                    })?
                    .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                Ok(summaries)
            })
            .await
            .map_err(Error::from)
    }
}
