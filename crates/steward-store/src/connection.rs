//! Connection pool construction and migrations.

use std::path::Path;

use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use tracing::info;

use crate::errors::Result;

/// Pooled SQLite connections.
pub type ConnectionPool = r2d2::Pool<SqliteConnectionManager>;

/// Open a file-backed pool with WAL enabled.
pub fn new_pool(path: &Path) -> Result<ConnectionPool> {
    let manager = SqliteConnectionManager::file(path).with_init(|conn| {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
    });
    let pool = r2d2::Pool::builder().build(manager)?;
    info!(path = %path.display(), "opened store");
    Ok(pool)
}

/// Open an in-memory pool for tests.
///
/// Pool size is pinned to 1 so every checkout sees the same database.
pub fn new_in_memory() -> Result<ConnectionPool> {
    let manager = SqliteConnectionManager::memory();
    let pool = r2d2::Pool::builder().max_size(1).build(manager)?;
    Ok(pool)
}

/// Create the store schema. Idempotent.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS sessions (
            key         TEXT PRIMARY KEY,
            token       TEXT NOT NULL,
            expires_at  INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS sessions_expiry ON sessions (expires_at);

        CREATE TABLE IF NOT EXISTS worker_status (
            key         TEXT PRIMARY KEY,
            status      TEXT NOT NULL CHECK (status IN ('RUNNING', 'STOPPED')),
            updated_at  INTEGER NOT NULL
        );",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let pool = new_in_memory().unwrap();
        let conn = pool.get().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
    }

    #[test]
    fn file_pool_opens_and_migrates() {
        let dir = tempfile::tempdir().unwrap();
        let pool = new_pool(&dir.path().join("steward.db")).unwrap();
        let conn = pool.get().unwrap();
        run_migrations(&conn).unwrap();
    }
}
