//! The container runtime seam.
//!
//! The lifecycle manager talks to the isolation layer only through
//! [`ContainerRuntime`]. Production uses [`DockerCli`], which shells out to
//! the docker binary; tests use [`crate::testutil::FakeRuntime`] or a
//! mockall mock.

use std::collections::BTreeMap;
use std::process::Output;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::capability::LaunchPlan;

/// Reference to a live (or formerly live) execution unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionHandle {
    /// Runtime-assigned unit identifier (container ID).
    pub unit_id: String,
}

/// Everything the runtime needs to start a unit.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    /// Unit name (shows up in `docker ps`).
    pub name: String,
    /// Image reference to boot.
    pub image: String,
    /// Capability-derived setup.
    pub plan: LaunchPlan,
    /// Caller-supplied env, overriding plan env on key collisions.
    pub extra_env: BTreeMap<String, String>,
    /// Whether the unit gets outbound network access.
    pub has_internet: bool,
}

impl LaunchSpec {
    /// Plan env merged with caller env (caller wins).
    #[must_use]
    pub fn merged_env(&self) -> BTreeMap<String, String> {
        let mut env = self.plan.env.clone();
        env.extend(self.extra_env.clone());
        env
    }
}

/// Observed state of an execution unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    /// Unit is live.
    Running,
    /// Unit exited; `success` reflects the exit code.
    Exited {
        /// Whether the unit exited zero.
        success: bool,
    },
    /// Unit is confirmed absent.
    Missing,
}

/// Runtime-level failures, distinct from lifecycle-manager errors.
#[derive(Debug, Error)]
pub enum RuntimeFailure {
    /// The unit could not be started.
    #[error("unit could not be started: {0}")]
    Start(String),
    /// The unit could not be removed.
    #[error("unit could not be removed: {0}")]
    Remove(String),
    /// The runtime itself could not be reached (transient).
    #[error("runtime unreachable: {0}")]
    Unreachable(String),
}

/// Isolated execution unit runtime.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Start a unit. Returns its handle on success.
    async fn spawn(&self, spec: &LaunchSpec) -> Result<ExecutionHandle, RuntimeFailure>;

    /// Tear a unit down. A unit that is already absent is `Ok` — removal is
    /// idempotent at this boundary.
    async fn remove(&self, handle: &ExecutionHandle) -> Result<(), RuntimeFailure>;

    /// Observe a unit's state. `Unreachable` means the answer is unknown,
    /// not that the unit failed.
    async fn inspect(&self, handle: &ExecutionHandle) -> Result<UnitState, RuntimeFailure>;
}

/// Docker-CLI-backed runtime.
pub struct DockerCli {
    docker_bin: String,
}

impl DockerCli {
    /// Use the `docker` binary from `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            docker_bin: "docker".to_string(),
        }
    }

    /// Use an explicit docker binary path.
    #[must_use]
    pub fn with_binary(docker_bin: impl Into<String>) -> Self {
        Self {
            docker_bin: docker_bin.into(),
        }
    }

    async fn run(&self, args: &[String]) -> Result<Output, RuntimeFailure> {
        debug!(?args, "docker invocation");
        Command::new(&self.docker_bin)
            .args(args)
            .output()
            .await
            .map_err(|e| RuntimeFailure::Unreachable(e.to_string()))
    }

    /// Bootstrap command run inside the unit: install packages, run setup
    /// steps, then hand off to the agent entrypoint.
    fn bootstrap_command(plan: &LaunchPlan) -> String {
        let mut parts = Vec::new();
        if !plan.packages.is_empty() {
            parts.push(format!(
                "apt-get update && apt-get install -y {}",
                plan.packages.join(" ")
            ));
        }
        parts.extend(plan.install_steps.iter().cloned());
        parts.push("exec steward-agent".to_string());
        parts.join(" && ")
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    #[instrument(skip(self, spec), fields(name = %spec.name, image = %spec.image))]
    async fn spawn(&self, spec: &LaunchSpec) -> Result<ExecutionHandle, RuntimeFailure> {
        let mut args = vec![
            "run".to_string(),
            "-d".to_string(),
            "--name".to_string(),
            spec.name.clone(),
            "--label".to_string(),
            "managed-by=steward".to_string(),
        ];
        if !spec.has_internet {
            args.push("--network".to_string());
            args.push("none".to_string());
        }
        for (key, value) in spec.merged_env() {
            args.push("-e".to_string());
            args.push(format!("{key}={value}"));
        }
        args.push(spec.image.clone());
        args.push("sh".to_string());
        args.push("-c".to_string());
        args.push(Self::bootstrap_command(&spec.plan));

        let output = self.run(&args).await?;
        if !output.status.success() {
            return Err(RuntimeFailure::Start(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        let unit_id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(ExecutionHandle { unit_id })
    }

    #[instrument(skip(self), fields(unit_id = %handle.unit_id))]
    async fn remove(&self, handle: &ExecutionHandle) -> Result<(), RuntimeFailure> {
        let args = vec![
            "rm".to_string(),
            "-f".to_string(),
            handle.unit_id.clone(),
        ];
        let output = self.run(&args).await?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        // Already gone counts as removed.
        if stderr.contains("No such container") {
            return Ok(());
        }
        Err(RuntimeFailure::Remove(stderr.trim().to_string()))
    }

    #[instrument(skip(self), fields(unit_id = %handle.unit_id))]
    async fn inspect(&self, handle: &ExecutionHandle) -> Result<UnitState, RuntimeFailure> {
        let args = vec![
            "inspect".to_string(),
            "-f".to_string(),
            "{{.State.Status}} {{.State.ExitCode}}".to_string(),
            handle.unit_id.clone(),
        ];
        let output = self.run(&args).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("No such object") {
                return Ok(UnitState::Missing);
            }
            return Err(RuntimeFailure::Unreachable(stderr.trim().to_string()));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut fields = stdout.split_whitespace();
        match (fields.next(), fields.next()) {
            (Some("running"), _) => Ok(UnitState::Running),
            (Some("exited" | "dead"), code) => Ok(UnitState::Exited {
                success: code == Some("0"),
            }),
            _ => Ok(UnitState::Running),
        }
    }
}
