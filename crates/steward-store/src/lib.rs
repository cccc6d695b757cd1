//! # steward-store
//!
//! Durable SQLite-backed key-value storage for Steward:
//!
//! - **Sessions**: `agent_session:{worker_key}` → resumable session token
//!   with TTL, create-if-absent atomically (the loser of a create race reads
//!   back the winner's token).
//! - **Worker status**: `worker:status:{worker_id}` → `RUNNING` / `STOPPED`.
//!
//! All access goes through an r2d2 connection pool; tests use the in-memory
//! constructor.
//!
//! ## Crate Position
//!
//! Leaf storage crate. Depended on by: steward-workers, steward-graph,
//! steward-server.

#![deny(unsafe_code)]

pub mod connection;
pub mod errors;
pub mod sessions;
pub mod status;

pub use connection::{ConnectionPool, new_in_memory, new_pool, run_migrations};
pub use errors::{Result, StoreError};
pub use sessions::{DEFAULT_SESSION_TTL_SECS, SessionStore};
pub use status::{RunStatus, StatusStore};
