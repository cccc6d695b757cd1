//! # steward-graph
//!
//! The orchestration graph engine: `run(initial_state) → final_state`.
//!
//! The graph is a fixed set of named nodes plus a pure routing function per
//! decision point — the topology is a compile-time constant; only the active
//! path through it is data-dependent.
//!
//! - **Nodes**: [`node::Node`] implementations under [`stages`], each
//!   returning a sparse [`steward_state::StatePatch`]
//! - **Routing**: pure, total functions in [`routing`]
//! - **Runner**: [`runner::GraphRunner`] — execute, merge, route, repeat,
//!   with an iteration cap and a designated failure exit
//!
//! A node that errors is a failed stage: its error lands in the state's
//! error accumulator and routing proceeds to [`node::NodeName::FailureExit`],
//! never a silent retry.
//!
//! ## Crate Position
//!
//! Aggregation layer. Depends on every leaf crate. Depended on by:
//! steward-server.

#![deny(unsafe_code)]

pub mod errors;
pub mod node;
pub mod routing;
pub mod runner;
pub mod stages;

pub use errors::GraphError;
pub use node::{Next, Node, NodeName, NodeSet, StageContext};
pub use runner::GraphRunner;
pub use stages::Stages;
