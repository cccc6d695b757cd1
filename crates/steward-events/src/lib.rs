//! # steward-events
//!
//! The Event Channel: a named publish/subscribe bus plus bounded per-agent
//! append-only streams.
//!
//! Delivery is at-most-once, best-effort broadcast. Publish failures are
//! logged and swallowed — event delivery is an observability side channel,
//! never part of the correctness-critical state path.
//!
//! ## Crate Position
//!
//! Depends on: steward-core. Depended on by: steward-graph, steward-workers,
//! steward-server.

#![deny(unsafe_code)]

pub mod channel;

pub use channel::{EventChannel, PublishedEvent};
