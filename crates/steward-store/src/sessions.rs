//! The session store: worker identity → resumable session token.
//!
//! A [`SessionRecord`](crate::sessions) exists independently of any worker
//! record's lifetime. It is created lazily on first access and every access
//! refreshes `expires_at` to the full TTL window — accessing a session
//! extends its life but never changes its token.
//!
//! INVARIANT: create-if-absent is atomic. Two simultaneous calls for the
//! same unseen key run `INSERT OR IGNORE` inside an immediate transaction;
//! the loser reads back the winner's token.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rusqlite::TransactionBehavior;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::connection::ConnectionPool;
use crate::errors::Result;

/// Default session TTL: 7200 seconds.
pub const DEFAULT_SESSION_TTL_SECS: i64 = 7200;

const KEY_PREFIX: &str = "agent_session";

/// TTL-bound session token store.
pub struct SessionStore {
    pool: ConnectionPool,
    ttl_secs: i64,
}

impl SessionStore {
    /// Create a store with the default TTL.
    #[must_use]
    pub fn new(pool: ConnectionPool) -> Self {
        Self::with_ttl(pool, DEFAULT_SESSION_TTL_SECS)
    }

    /// Create a store with a custom TTL (seconds).
    #[must_use]
    pub fn with_ttl(pool: ConnectionPool, ttl_secs: i64) -> Self {
        Self { pool, ttl_secs }
    }

    /// Get the session token for a worker identity, creating one if absent.
    ///
    /// The returned token is stable across calls; only `expires_at` moves
    /// forward (never shrinks). An expired row counts as absent and is
    /// replaced with a fresh token — the prior agent context is gone.
    #[instrument(skip(self))]
    pub fn get_or_create(&self, worker_key: &str) -> Result<String> {
        let key = format!("{KEY_PREFIX}:{worker_key}");
        let now = Utc::now().timestamp();
        let expires = now + self.ttl_secs;
        let candidate = Uuid::now_v7().to_string();

        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let _ = tx.execute(
            "DELETE FROM sessions WHERE key = ?1 AND expires_at <= ?2",
            (&key, now),
        )?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO sessions (key, token, expires_at) VALUES (?1, ?2, ?3)",
            (&key, &candidate, expires),
        )?;
        let _ = tx.execute(
            "UPDATE sessions SET expires_at = ?2 WHERE key = ?1",
            (&key, expires),
        )?;
        let token: String =
            tx.query_row("SELECT token FROM sessions WHERE key = ?1", [&key], |row| {
                row.get(0)
            })?;
        tx.commit()?;

        if inserted > 0 {
            debug!(worker_key, "created session");
        }
        Ok(token)
    }

    /// Remaining TTL in seconds for a worker identity, if a session exists.
    pub fn remaining_ttl(&self, worker_key: &str) -> Result<Option<i64>> {
        use rusqlite::OptionalExtension;
        let key = format!("{KEY_PREFIX}:{worker_key}");
        let now = Utc::now().timestamp();
        let conn = self.pool.get()?;
        let expires: Option<i64> = conn
            .query_row("SELECT expires_at FROM sessions WHERE key = ?1", [&key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(expires.map(|e| e - now))
    }

    /// Delete all expired session rows. Returns the number removed.
    #[instrument(skip(self))]
    pub fn delete_expired(&self) -> Result<usize> {
        let now = Utc::now().timestamp();
        let conn = self.pool.get()?;
        let removed = conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", [now])?;
        Ok(removed)
    }

    /// Run the expiry sweep on an interval until cancelled.
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => match store.delete_expired() {
                        Ok(0) => {}
                        Ok(removed) => info!(removed, "session sweep removed expired rows"),
                        Err(e) => warn!(error = %e, "session sweep failed"),
                    },
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{new_in_memory, run_migrations};

    fn store() -> SessionStore {
        let pool = new_in_memory().unwrap();
        run_migrations(&pool.get().unwrap()).unwrap();
        SessionStore::new(pool)
    }

    #[test]
    fn first_access_creates_token() {
        let store = store();
        let token = store.get_or_create("worker-1").unwrap();
        assert!(!token.is_empty());
    }

    #[test]
    fn repeated_access_returns_same_token() {
        let store = store();
        let first = store.get_or_create("worker-1").unwrap();
        let second = store.get_or_create("worker-1").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn distinct_keys_get_distinct_tokens() {
        let store = store();
        let a = store.get_or_create("worker-a").unwrap();
        let b = store.get_or_create("worker-b").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn access_refreshes_ttl_monotonically() {
        let store = store();
        let _ = store.get_or_create("worker-1").unwrap();
        let before = store.remaining_ttl("worker-1").unwrap().unwrap();

        let _ = store.get_or_create("worker-1").unwrap();
        let after = store.remaining_ttl("worker-1").unwrap().unwrap();
        assert!(after >= before);
    }

    #[test]
    fn expired_row_counts_as_absent() {
        let pool = new_in_memory().unwrap();
        run_migrations(&pool.get().unwrap()).unwrap();
        // TTL of zero: every row is born expired.
        let expiring = SessionStore::with_ttl(pool.clone(), 0);
        let first = expiring.get_or_create("worker-1").unwrap();

        let fresh = SessionStore::new(pool);
        let second = fresh.get_or_create("worker-1").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn delete_expired_sweeps_only_expired() {
        let pool = new_in_memory().unwrap();
        run_migrations(&pool.get().unwrap()).unwrap();

        let expiring = SessionStore::with_ttl(pool.clone(), 0);
        let _ = expiring.get_or_create("dead").unwrap();
        let live_store = SessionStore::new(pool);
        let _ = live_store.get_or_create("live").unwrap();

        let removed = live_store.delete_expired().unwrap();
        assert_eq!(removed, 1);
        assert!(live_store.remaining_ttl("live").unwrap().is_some());
        assert!(live_store.remaining_ttl("dead").unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_task_removes_expired_rows() {
        let pool = new_in_memory().unwrap();
        run_migrations(&pool.get().unwrap()).unwrap();
        let expiring = SessionStore::with_ttl(pool.clone(), 0);
        let _ = expiring.get_or_create("dead").unwrap();

        let store = Arc::new(SessionStore::new(pool));
        let cancel = CancellationToken::new();
        let handle = store.spawn_sweeper(Duration::from_secs(60), cancel.clone());

        // The first interval tick fires immediately; let the task run it.
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        assert!(store.remaining_ttl("dead").unwrap().is_none());

        cancel.cancel();
        handle.await.unwrap();
    }
}
