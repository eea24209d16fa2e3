//! Schema migrations for the kv store.
//!
//! A `_migrations` table records the highest applied version; anything
//! newer in [`MIGRATIONS`] runs in order inside one connection call.

use super::Error;
use tokio_rusqlite::{Connection, params};

/// Ordered (version, SQL batch) pairs. Versions are dense and start
/// at 1; the batches themselves are idempotent.
const MIGRATIONS: &[(i64, &str)] = &[(1, include_str!("../../migrations/001_kv.sql"))];

/// Bring the schema up to the latest version.
///
/// # Errors
///
/// Returns an error when a migration batch fails to execute.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(Error::from)?;

        let current: i64 = conn
            .query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| {
                row.get(0)
            })
            .map_err(Error::from)?;

        for &(version, sql) in MIGRATIONS.iter().filter(|&&(v, _)| v > current) {
            conn.execute_batch(sql)?;
            conn.execute(
                "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
                params![version, chrono::Utc::now().to_rfc3339()],
            )
            .map_err(Error::from)?;
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}
