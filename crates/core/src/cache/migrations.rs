//! Schema for the cache stores.
//!
//! Applied versions are recorded in `_migrations`; a database opened by an
//! older build picks up the missing batches on the next open.

use super::Error;
use tokio_rusqlite::{Connection, params};

/// Schema batches keyed by version, oldest first.
const MIGRATIONS: &[(i64, &str)] = &[(1, include_str!("../../migrations/001_cache_storage.sql"))];

/// Bring the cache schema up to the latest version.
///
/// # Errors
///
/// Returns [`Error::MigrationFailed`] naming the version whose batch did not apply.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )?;

        let applied: i64 = conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))?;

        for &(version, sql) in MIGRATIONS.iter().filter(|(version, _)| *version > applied) {
            let tx = conn.transaction()?;
            tx.execute_batch(sql)
                .map_err(|e| Error::MigrationFailed(format!("version {version}: {e}")))?;
            tx.execute(
                "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
                params![version, chrono::Utc::now().to_rfc3339()],
            )?;
            tx.commit()?;
            tracing::debug!(version, "applied cache schema migration");
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn migrated() -> Connection {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn).await.unwrap();
        conn
    }

    #[tokio::test]
    async fn test_reopen_applies_nothing_twice() {
        let conn = migrated().await;
        run(&conn).await.unwrap();

        let (tables, versions): (i64, i64) = conn
            .call(|conn| -> tokio_rusqlite::rusqlite::Result<(i64, i64)> {
                let tables = conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('caches', 'cache_entries')",
                    [],
                    |row| row.get(0),
                )?;
                let versions = conn.query_row("SELECT COUNT(*) FROM _migrations", [], |row| row.get(0))?;
                Ok((tables, versions))
            })
            .await
            .unwrap();

        assert_eq!(tables, 2);
        assert_eq!(versions, MIGRATIONS.len() as i64);
    }

    #[tokio::test]
    async fn test_same_request_in_two_generations() {
        let conn = migrated().await;

        let rows: i64 = conn
            .call(|conn| {
                conn.execute_batch(
                    "INSERT INTO caches (name, created_at) VALUES ('budget-pwa-v1', 'now'), ('budget-pwa-v2', 'now');
                    INSERT INTO cache_entries
                        (cache_id, key_hash, method, url, response_url, status_code, headers_json, body, stored_at)
                    SELECT id, 'k', 'GET', 'http://localhost:8080/', 'http://localhost:8080/', 200, '[]', x'', 'now'
                    FROM caches;",
                )?;
                conn.query_row("SELECT COUNT(*) FROM cache_entries WHERE key_hash = 'k'", [], |row| row.get(0))
            })
            .await
            .unwrap();

        assert_eq!(rows, 2);
    }

    #[tokio::test]
    async fn test_entry_requires_a_store() {
        let conn = migrated().await;

        let result = conn
            .call(|conn| {
                conn.execute_batch("PRAGMA foreign_keys = ON;")?;
                conn.execute(
                    "INSERT INTO cache_entries
                        (cache_id, key_hash, method, url, response_url, status_code, headers_json, body, stored_at)
                    VALUES (42, 'k', 'GET', 'u', 'u', 200, '[]', x'', 'now')",
                    [],
                )
            })
            .await;

        assert!(result.is_err());
    }
}
