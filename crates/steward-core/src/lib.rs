//! # steward-core
//!
//! Foundation types for the Steward orchestrator.
//!
//! This crate provides the shared vocabulary that all other Steward crates
//! depend on:
//!
//! - **Branded IDs**: [`ids::ThreadId`], [`ids::WorkerId`], [`ids::CorrelationId`] as newtypes
//! - **Events**: [`events::AgentEvent`] lifecycle facts plus channel naming helpers
//! - **Retry**: [`retry::RetryConfig`] and backoff calculation
//! - **Metrics**: [`metrics`] name constants shared by every recording crate
//! - **Errors**: [`errors::ValidationError`] for malformed model/config input
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by all other steward crates.

#![deny(unsafe_code)]

pub mod errors;
pub mod events;
pub mod ids;
pub mod metrics;
pub mod retry;

pub use errors::ValidationError;
pub use events::{AgentEvent, EventKind, channel_name};
pub use ids::{CorrelationId, ThreadId, WorkerId};
pub use retry::RetryConfig;
