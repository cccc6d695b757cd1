//! # steward-state
//!
//! The mutable workflow state for one conversation thread, plus the merge
//! machinery that lets concurrent stages return sparse updates safely.
//!
//! - **Model**: [`WorkflowState`] and its nested task-context types
//! - **Patches**: [`StatePatch`] sparse updates merged via per-field reducers
//! - **Store**: [`StateStore`] holding exactly one live state per thread
//!
//! Reducer semantics (see [`WorkflowState::apply`]): last-write-wins for
//! scalars, set-union for capability tags, append for messages and errors.
//! Union is commutative and idempotent, so re-delivered capability updates
//! are harmless.
//!
//! ## Crate Position
//!
//! Depends on: steward-core. Depended on by: steward-graph, steward-server.

#![deny(unsafe_code)]

pub mod model;
pub mod patch;
pub mod store;

pub use model::{
    ChatMessage, Complexity, IntentKind, MessageRole, ProjectIntent, ProjectRef, ProjectSpec,
    StageStatus, WorkflowState,
};
pub use patch::StatePatch;
pub use store::{StateStore, StateStoreError};
