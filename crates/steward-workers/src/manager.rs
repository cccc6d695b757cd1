//! Worker lifecycle manager.
//!
//! Owns every [`WorkerRecord`] exclusively; the orchestration engine holds
//! only the `WorkerId` and observes transitions via `get_status` or the
//! event channel.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use metrics::gauge;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use steward_core::WorkerId;
use steward_core::metrics::WORKERS_ACTIVE;
use steward_store::{RunStatus, StatusStore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::capability::{compose, validate_registry};
use crate::config::{AgentType, WorkerConfig};
use crate::errors::WorkerError;
use crate::runtime::{ContainerRuntime, ExecutionHandle, LaunchSpec, RuntimeFailure, UnitState};

/// Observed run state of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Unit requested but not yet confirmed live.
    Initializing,
    /// Unit is live.
    Running,
    /// Unit exited zero.
    Completed,
    /// Unit exited non-zero.
    Failed,
    /// Unit was torn down.
    Stopped,
    /// Runtime unreachable; state cannot be determined right now.
    Unknown,
}

impl RunState {
    /// Whether this state is terminal.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Stopped)
    }
}

/// Why a worker was deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Explicit caller request.
    UserRequested,
    /// The TTL sweeper reclaimed an expired unit.
    TtlExpired,
}

/// One spawned execution unit, owned by the manager.
#[derive(Debug, Clone)]
pub struct WorkerRecord {
    /// Worker identity.
    pub worker_id: WorkerId,
    /// Agent kind running inside.
    pub agent_type: AgentType,
    /// Last observed run state.
    pub run_state: RunState,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Deadline after which the sweeper reclaims the unit.
    pub ttl_deadline: DateTime<Utc>,
    /// Runtime handle for the execution unit.
    pub handle: ExecutionHandle,
}

/// Spawns, tracks, and reclaims isolated execution units.
pub struct WorkerManager {
    runtime: Arc<dyn ContainerRuntime>,
    status: Arc<StatusStore>,
    records: Mutex<HashMap<WorkerId, WorkerRecord>>,
}

impl WorkerManager {
    /// Create a manager. Fails if the static capability registry is
    /// incomplete (startup invariant).
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        status: Arc<StatusStore>,
    ) -> Result<Self, WorkerError> {
        validate_registry()?;
        Ok(Self {
            runtime,
            status,
            records: Mutex::new(HashMap::new()),
        })
    }

    /// Launch an isolated execution unit from a declarative configuration.
    ///
    /// On success the record is tracked as RUNNING and a `RUNNING` status
    /// marker is persisted. Fails with [`WorkerError::Provision`] if the
    /// runtime cannot start the unit.
    #[instrument(skip(self, config), fields(worker_id = %worker_id, agent_type = %config.agent_type))]
    pub async fn create_worker(
        &self,
        worker_id: WorkerId,
        image_ref: &str,
        config: WorkerConfig,
    ) -> Result<ExecutionHandle, WorkerError> {
        config.validate()?;
        let plan = compose(&config.capabilities)?;

        let mut extra_env = config.env_vars.clone();
        let _ = extra_env.insert("STEWARD_WORKER_ID".to_string(), worker_id.to_string());
        let _ = extra_env.insert(
            "STEWARD_AGENT_TYPE".to_string(),
            config.agent_type.to_string(),
        );
        if !config.allowed_tools.is_empty() {
            let _ = extra_env.insert(
                "STEWARD_ALLOWED_TOOLS".to_string(),
                config.allowed_tools.join(","),
            );
        }

        let spec = LaunchSpec {
            name: config.name.clone(),
            image: image_ref.to_string(),
            plan,
            extra_env,
            has_internet: config.has_internet,
        };

        let handle = self
            .runtime
            .spawn(&spec)
            .await
            .map_err(|e| WorkerError::Provision(e.to_string()))?;

        let now = Utc::now();
        let record = WorkerRecord {
            worker_id: worker_id.clone(),
            agent_type: config.agent_type,
            run_state: RunState::Running,
            created_at: now,
            ttl_deadline: now + TimeDelta::hours(i64::from(config.ttl_hours)),
            handle: handle.clone(),
        };
        let count = {
            let mut records = self.records.lock();
            let _ = records.insert(worker_id.clone(), record);
            records.len()
        };
        gauge!(WORKERS_ACTIVE).set(count as f64);

        self.status.set(worker_id.as_str(), RunStatus::Running)?;
        info!(unit_id = %handle.unit_id, "worker started");
        Ok(handle)
    }

    /// Tear a worker down. Idempotent: a worker with no record is a no-op
    /// and the status marker stays absent.
    pub async fn delete_worker(&self, worker_id: &WorkerId) -> Result<(), WorkerError> {
        self.delete_with_reason(worker_id, StopReason::UserRequested)
            .await
    }

    #[instrument(skip(self), fields(worker_id = %worker_id, ?reason))]
    async fn delete_with_reason(
        &self,
        worker_id: &WorkerId,
        reason: StopReason,
    ) -> Result<(), WorkerError> {
        let Some(record) = self.records.lock().remove(worker_id) else {
            return Ok(());
        };

        if let Err(e) = self.runtime.remove(&record.handle).await {
            // Teardown failed: restore the record so a later attempt can
            // retry; the status marker is only moved to STOPPED after a
            // confirmed teardown.
            let reason_text = e.to_string();
            let _ = self.records.lock().insert(worker_id.clone(), record);
            return Err(WorkerError::Teardown {
                worker_id: worker_id.clone(),
                reason: reason_text,
            });
        }

        self.status.set(worker_id.as_str(), RunStatus::Stopped)?;
        gauge!(WORKERS_ACTIVE).set(self.records.lock().len() as f64);
        match reason {
            StopReason::UserRequested => info!("worker deleted"),
            StopReason::TtlExpired => warn!("worker reclaimed after ttl expiry"),
        }
        Ok(())
    }

    /// Observe a worker's run state.
    ///
    /// An unreachable runtime reports [`RunState::Unknown`] rather than
    /// assuming failure — transient network trouble is not a worker failure.
    #[instrument(skip(self), fields(worker_id = %worker_id))]
    pub async fn get_status(&self, worker_id: &WorkerId) -> Result<RunState, WorkerError> {
        let handle = {
            let records = self.records.lock();
            let record = records
                .get(worker_id)
                .ok_or_else(|| WorkerError::NotFound(worker_id.clone()))?;
            record.handle.clone()
        };

        let state = match self.runtime.inspect(&handle).await {
            Ok(UnitState::Running) => RunState::Running,
            Ok(UnitState::Exited { success: true }) => RunState::Completed,
            Ok(UnitState::Exited { success: false }) => RunState::Failed,
            Ok(UnitState::Missing) => RunState::Stopped,
            Err(RuntimeFailure::Unreachable(reason)) => {
                warn!(reason, "runtime unreachable; reporting unknown");
                return Ok(RunState::Unknown);
            }
            Err(e) => {
                warn!(error = %e, "inspect failed; reporting unknown");
                return Ok(RunState::Unknown);
            }
        };

        if let Some(record) = self.records.lock().get_mut(worker_id) {
            record.run_state = state;
        }
        Ok(state)
    }

    /// Poll until the worker reaches a terminal state or the deadline passes.
    ///
    /// Returns the final observed state; on timeout, the last observed
    /// (non-terminal) state. `Unknown` readings are retried, never treated
    /// as terminal.
    pub async fn wait_for_terminal(
        &self,
        worker_id: &WorkerId,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<RunState, WorkerError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let state = self.get_status(worker_id).await?;
            if state.is_terminal() {
                return Ok(state);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(state);
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Snapshot a worker's record.
    #[must_use]
    pub fn record(&self, worker_id: &WorkerId) -> Option<WorkerRecord> {
        self.records.lock().get(worker_id).cloned()
    }

    /// Number of tracked workers.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.records.lock().len()
    }

    /// Reclaim every expired, still-tracked worker. Returns how many were
    /// deleted. Teardown failures are logged and left for the next sweep.
    #[instrument(skip(self))]
    pub async fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let expired: Vec<WorkerId> = {
            let records = self.records.lock();
            records
                .values()
                .filter(|r| now >= r.ttl_deadline)
                .map(|r| r.worker_id.clone())
                .collect()
        };

        let mut reclaimed = 0;
        for worker_id in expired {
            match self
                .delete_with_reason(&worker_id, StopReason::TtlExpired)
                .await
            {
                Ok(()) => reclaimed += 1,
                Err(e) => warn!(worker_id = %worker_id, error = %e, "sweep teardown failed"),
            }
        }
        reclaimed
    }

    /// Run the TTL sweep on an interval until cancelled.
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let reclaimed = manager.sweep_expired().await;
                        if reclaimed > 0 {
                            info!(reclaimed, "ttl sweep reclaimed workers");
                        }
                    }
                }
            }
        })
    }
}
