//! # steward-workers
//!
//! The Worker Lifecycle Manager: spawns isolated execution units from a
//! declarative configuration, tracks their run state, enforces time-to-live,
//! and tears them down.
//!
//! - **Capabilities**: closed set of tagged variants composed into a
//!   [`capability::LaunchPlan`] (packages, install steps, env), registered in
//!   a static table validated for completeness at startup.
//! - **Runtime**: [`runtime::ContainerRuntime`] trait with a docker-CLI
//!   implementation; tests use [`testutil::FakeRuntime`].
//! - **Manager**: [`manager::WorkerManager`] owns all [`manager::WorkerRecord`]s
//!   exclusively; other components hold only the `WorkerId`.
//!
//! ## Crate Position
//!
//! Depends on: steward-core, steward-store. Depended on by: steward-graph,
//! steward-server.

#![deny(unsafe_code)]

pub mod capability;
pub mod config;
pub mod errors;
pub mod manager;
pub mod runtime;
pub mod testutil;

pub use capability::{Capability, LaunchPlan, compose, validate_registry};
pub use config::{AgentType, WorkerConfig};
pub use errors::WorkerError;
pub use manager::{RunState, StopReason, WorkerManager, WorkerRecord};
pub use runtime::{ContainerRuntime, DockerCli, ExecutionHandle, LaunchSpec, UnitState};
