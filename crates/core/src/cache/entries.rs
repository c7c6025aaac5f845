//! Entry-level operations on a single cache store.

use super::connection::CacheDb;
use super::hash::request_key;
use crate::{Error, Request, Response};
use bytes::Bytes;
use chrono::Utc;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, types::Type};
use url::Url;

/// Handle to one named cache store.
#[derive(Clone, Debug)]
pub struct Cache {
    db: CacheDb,
    id: i64,
    name: String,
}

/// A request/response pair ready to be written.
struct EntryRow {
    key_hash: String,
    method: String,
    url: String,
    response_url: String,
    status: u16,
    headers_json: String,
    body: Bytes,
}

impl EntryRow {
    fn new(request: &Request, response: &Response) -> Result<Self, Error> {
        if !request.is_get() {
            return Err(Error::InvalidRequest(format!(
                "only GET requests can be cached, got {} {}",
                request.method, request.url
            )));
        }

        let headers_json = serde_json::to_string(&response.headers)
            .map_err(|e| Error::InvalidInput(format!("failed to encode headers: {e}")))?;

        Ok(Self {
            key_hash: request_key(request),
            method: request.method.clone(),
            url: request.cache_url().to_string(),
            response_url: response.url.to_string(),
            status: response.status,
            headers_json,
            body: response.body.clone(),
        })
    }

    fn upsert(&self, conn: &rusqlite::Connection, cache_id: i64, stored_at: &str) -> rusqlite::Result<usize> {
        conn.execute(
            "INSERT INTO cache_entries (
                cache_id, key_hash, method, url, response_url, status_code, headers_json, body, stored_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(cache_id, key_hash) DO UPDATE SET
                response_url = excluded.response_url,
                status_code = excluded.status_code,
                headers_json = excluded.headers_json,
                body = excluded.body,
                stored_at = excluded.stored_at",
            params![
                cache_id,
                &self.key_hash,
                &self.method,
                &self.url,
                &self.response_url,
                self.status,
                &self.headers_json,
                &self.body[..],
                stored_at,
            ],
        )
    }
}

/// Decode `(response_url, status_code, headers_json, body)` columns.
pub(crate) fn response_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Response> {
    let url: String = row.get(0)?;
    let url = Url::parse(&url).map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;
    let status: u16 = row.get(1)?;
    let headers_json: String = row.get(2)?;
    let headers = serde_json::from_str(&headers_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;
    let body: Vec<u8> = row.get(3)?;

    Ok(Response { url, status, headers, body: Bytes::from(body) })
}

impl Cache {
    pub(crate) fn new(db: CacheDb, id: i64, name: String) -> Self {
        Self { db, id, name }
    }

    /// Cache generation this store belongs to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look `request` up in this store. Non-GET requests never match.
    pub async fn match_request(&self, request: &Request) -> Result<Option<Response>, Error> {
        if !request.is_get() {
            return Ok(None);
        }

        let key_hash = request_key(request);
        let cache_id = self.id;
        self.db
            .conn
            .call(move |conn| -> Result<Option<Response>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT response_url, status_code, headers_json, body
                    FROM cache_entries WHERE cache_id = ?1 AND key_hash = ?2",
                )?;

                match stmt.query_row(params![cache_id, key_hash], response_from_row) {
                    Ok(response) => Ok(Some(response)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace the entry for `request`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRequest` for non-GET requests.
    pub async fn put(&self, request: &Request, response: &Response) -> Result<(), Error> {
        let row = EntryRow::new(request, response)?;
        let cache_id = self.id;
        let stored_at = Utc::now().to_rfc3339();

        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                row.upsert(conn, cache_id, &stored_at)?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Store every pair in one transaction: either all entries land or none do.
    pub async fn put_all(&self, pairs: &[(Request, Response)]) -> Result<(), Error> {
        let rows = pairs
            .iter()
            .map(|(request, response)| EntryRow::new(request, response))
            .collect::<Result<Vec<_>, _>>()?;
        let cache_id = self.id;
        let stored_at = Utc::now().to_rfc3339();

        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                for row in &rows {
                    row.upsert(&tx, cache_id, &stored_at)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Request URLs stored in this store, in insertion order.
    pub async fn keys(&self) -> Result<Vec<String>, Error> {
        let cache_id = self.id;
        self.db
            .conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM cache_entries WHERE cache_id = ?1 ORDER BY rowid ASC")?;
                let urls = stmt
                    .query_map(params![cache_id], |row| row.get(0))?
                    .collect::<Result<Vec<String>, rusqlite::Error>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RequestMode;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let cache = db.open_cache("budget-pwa-v1").await.unwrap();
        let req = Request::get(url("http://localhost:8080/app.js"));
        let res = Response::new(url("http://localhost:8080/app.js"), 200, "console.log(1)")
            .with_header("content-type", "text/javascript");

        cache.put(&req, &res).await.unwrap();

        let hit = cache.match_request(&req).await.unwrap().unwrap();
        assert_eq!(hit, res);
    }

    #[tokio::test]
    async fn test_match_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let cache = db.open_cache("budget-pwa-v1").await.unwrap();
        let result = cache.match_request(&Request::get(url("http://localhost:8080/nope"))).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_put_rejects_non_get() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let cache = db.open_cache("budget-pwa-v1").await.unwrap();
        let req = Request::new("POST", url("http://localhost:8080/api"), RequestMode::Cors);
        let res = Response::new(url("http://localhost:8080/api"), 200, "{}");

        let result = cache.put(&req, &res).await;
        assert!(matches!(result, Err(Error::InvalidRequest(_))));
        assert!(cache.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_replaces_body() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let cache = db.open_cache("budget-pwa-v1").await.unwrap();
        let req = Request::get(url("http://localhost:8080/app.js"));

        cache.put(&req, &Response::new(url("http://localhost:8080/app.js"), 200, "v1")).await.unwrap();
        cache.put(&req, &Response::new(url("http://localhost:8080/app.js"), 200, "v2")).await.unwrap();

        let hit = cache.match_request(&req).await.unwrap().unwrap();
        assert_eq!(&hit.body[..], b"v2");
        assert_eq!(cache.keys().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_put_all_is_atomic() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let cache = db.open_cache("budget-pwa-v1").await.unwrap();
        let good = (Request::get(url("http://localhost:8080/")), Response::new(url("http://localhost:8080/"), 200, ""));
        let bad = (
            Request::new("PUT", url("http://localhost:8080/x"), RequestMode::Cors),
            Response::new(url("http://localhost:8080/x"), 200, ""),
        );

        assert!(cache.put_all(&[good.clone(), bad]).await.is_err());
        assert!(cache.keys().await.unwrap().is_empty());

        cache.put_all(&[good]).await.unwrap();
        assert_eq!(cache.keys().await.unwrap(), vec!["http://localhost:8080/"]);
    }

    #[tokio::test]
    async fn test_keys_in_insertion_order() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let cache = db.open_cache("budget-pwa-v1").await.unwrap();
        let a = Request::get(url("http://localhost:8080/a.css"));
        let b = Request::get(url("http://localhost:8080/b.css#frag"));
        cache.put(&a, &Response::new(url("http://localhost:8080/a.css"), 200, "a")).await.unwrap();
        cache.put(&b, &Response::new(url("http://localhost:8080/b.css"), 200, "b")).await.unwrap();

        assert_eq!(cache.keys().await.unwrap(), vec!["http://localhost:8080/a.css", "http://localhost:8080/b.css"]);

        cache.put(&a, &Response::new(url("http://localhost:8080/a.css"), 200, "a2")).await.unwrap();
        assert_eq!(cache.keys().await.unwrap(), vec!["http://localhost:8080/a.css", "http://localhost:8080/b.css"]);
    }
}
