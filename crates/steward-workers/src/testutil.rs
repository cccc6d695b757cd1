//! In-memory runtime double shared by this crate's tests and downstream
//! crates' tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::runtime::{ContainerRuntime, ExecutionHandle, LaunchSpec, RuntimeFailure, UnitState};

/// Fake runtime: units live in a map, state transitions are scripted by the
/// test.
#[derive(Default)]
pub struct FakeRuntime {
    units: Mutex<HashMap<String, UnitState>>,
    specs: Mutex<Vec<LaunchSpec>>,
    counter: AtomicU64,
    fail_spawn: Mutex<Option<String>>,
    unreachable: Mutex<bool>,
    auto_exit: Mutex<Option<bool>>,
}

impl FakeRuntime {
    /// A fresh fake with no units.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `spawn` fail with the given reason.
    pub fn fail_next_spawn(&self, reason: impl Into<String>) {
        *self.fail_spawn.lock() = Some(reason.into());
    }

    /// Make `inspect` report the runtime as unreachable.
    pub fn set_unreachable(&self, unreachable: bool) {
        *self.unreachable.lock() = unreachable;
    }

    /// Script a unit's observed state.
    pub fn set_unit_state(&self, unit_id: &str, state: UnitState) {
        let _ = self.units.lock().insert(unit_id.to_string(), state);
    }

    /// Make every unit report an immediate exit on inspection
    /// (`success` per the flag). Useful for driving wait loops in tests.
    pub fn set_auto_exit(&self, success: bool) {
        *self.auto_exit.lock() = Some(success);
    }

    /// Every spec passed to `spawn`, in order.
    #[must_use]
    pub fn spawned_specs(&self) -> Vec<LaunchSpec> {
        self.specs.lock().clone()
    }

    /// Whether a unit currently exists.
    #[must_use]
    pub fn has_unit(&self, unit_id: &str) -> bool {
        self.units.lock().contains_key(unit_id)
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn spawn(&self, spec: &LaunchSpec) -> Result<ExecutionHandle, RuntimeFailure> {
        if let Some(reason) = self.fail_spawn.lock().take() {
            return Err(RuntimeFailure::Start(reason));
        }
        let unit_id = format!("unit-{}", self.counter.fetch_add(1, Ordering::Relaxed));
        let _ = self.units.lock().insert(unit_id.clone(), UnitState::Running);
        self.specs.lock().push(spec.clone());
        Ok(ExecutionHandle { unit_id })
    }

    async fn remove(&self, handle: &ExecutionHandle) -> Result<(), RuntimeFailure> {
        let _ = self.units.lock().remove(&handle.unit_id);
        Ok(())
    }

    async fn inspect(&self, handle: &ExecutionHandle) -> Result<UnitState, RuntimeFailure> {
        if *self.unreachable.lock() {
            return Err(RuntimeFailure::Unreachable("fake runtime offline".into()));
        }
        if let Some(success) = *self.auto_exit.lock() {
            if self.units.lock().contains_key(&handle.unit_id) {
                return Ok(UnitState::Exited { success });
            }
        }
        Ok(self
            .units
            .lock()
            .get(&handle.unit_id)
            .copied()
            .unwrap_or(UnitState::Missing))
    }
}
