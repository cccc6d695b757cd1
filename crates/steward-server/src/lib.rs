//! # steward-server
//!
//! The front-end adapter boundary: an HTTP surface over the orchestration
//! graph plus the per-thread run dispatcher.
//!
//! - **Dispatcher**: [`dispatcher::Dispatcher`] — one active run per thread,
//!   a semaphore capping total concurrency, cancellation on abort/shutdown
//! - **HTTP**: [`http::router`] — `POST /messages`, `GET /health`,
//!   `GET /metrics`
//! - **Metrics**: [`metrics::install_recorder`] for the Prometheus endpoint
//!
//! ## Crate Position
//!
//! Outer surface. Depends on steward-graph and the leaf crates. Depended on
//! by: the steward binary.

#![deny(unsafe_code)]

pub mod dispatcher;
pub mod errors;
pub mod http;
pub mod messages;
pub mod metrics;

pub use dispatcher::Dispatcher;
pub use errors::ServerError;
pub use http::{AppState, router};
pub use messages::{InboundMessage, OutboundMessage};
