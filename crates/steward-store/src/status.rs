//! Worker status markers: `worker:status:{worker_id}` → `RUNNING` / `STOPPED`.

use chrono::Utc;
use rusqlite::OptionalExtension;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::connection::ConnectionPool;
use crate::errors::Result;

const KEY_PREFIX: &str = "worker:status";

/// Persisted worker run status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Worker execution unit is live.
    #[serde(rename = "RUNNING")]
    Running,
    /// Worker was torn down (user stop or TTL expiry).
    #[serde(rename = "STOPPED")]
    Stopped,
}

impl RunStatus {
    /// SQL string representation (matches the `CHECK` constraint values).
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Stopped => "STOPPED",
        }
    }

    fn from_sql(raw: &str) -> Option<Self> {
        match raw {
            "RUNNING" => Some(Self::Running),
            "STOPPED" => Some(Self::Stopped),
            _ => None,
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Durable status marker store, keyed by worker ID.
pub struct StatusStore {
    pool: ConnectionPool,
}

impl StatusStore {
    /// Create a status store over the shared pool.
    #[must_use]
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    /// Upsert the status marker for a worker.
    #[instrument(skip(self))]
    pub fn set(&self, worker_id: &str, status: RunStatus) -> Result<()> {
        let key = format!("{KEY_PREFIX}:{worker_id}");
        let conn = self.pool.get()?;
        let _ = conn.execute(
            "INSERT INTO worker_status (key, status, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET status = excluded.status, updated_at = excluded.updated_at",
            (&key, status.as_sql(), Utc::now().timestamp()),
        )?;
        Ok(())
    }

    /// Read the status marker for a worker, if present.
    pub fn get(&self, worker_id: &str) -> Result<Option<RunStatus>> {
        let key = format!("{KEY_PREFIX}:{worker_id}");
        let conn = self.pool.get()?;
        let raw: Option<String> = conn
            .query_row("SELECT status FROM worker_status WHERE key = ?1", [&key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(raw.as_deref().and_then(RunStatus::from_sql))
    }

    /// Remove the status marker for a worker. Missing keys are a no-op.
    pub fn remove(&self, worker_id: &str) -> Result<()> {
        let key = format!("{KEY_PREFIX}:{worker_id}");
        let conn = self.pool.get()?;
        let _ = conn.execute("DELETE FROM worker_status WHERE key = ?1", [&key])?;
        Ok(())
    }
}
