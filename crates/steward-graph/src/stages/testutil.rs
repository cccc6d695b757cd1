//! Graph test harness shared by this crate's tests and downstream crates'
//! tests.

use std::sync::Arc;
use std::time::Duration;

use steward_api::ApiClient;
use steward_core::RetryConfig;
use steward_events::EventChannel;
use steward_settings::{PermissionGate, WorkerSettings};
use steward_store::{SessionStore, StatusStore, new_in_memory, run_migrations};
use steward_workers::WorkerManager;
use steward_workers::testutil::FakeRuntime;

use crate::node::StageContext;

/// A [`StageContext`] wired to in-memory stores and a scripted runtime.
pub struct Harness {
    /// The assembled context.
    pub ctx: StageContext,
    /// The runtime double behind `ctx.workers`.
    pub runtime: Arc<FakeRuntime>,
}

/// Build a harness whose API client points at `api_base`.
///
/// Panics on setup failure; this is test support code.
#[must_use]
pub fn harness(api_base: &str) -> Harness {
    let pool = new_in_memory().expect("in-memory pool");
    run_migrations(&pool.get().expect("pool checkout")).expect("migrations");

    let runtime = Arc::new(FakeRuntime::new());
    let workers = WorkerManager::new(
        Arc::clone(&runtime) as Arc<dyn steward_workers::ContainerRuntime>,
        Arc::new(StatusStore::new(pool.clone())),
    )
    .expect("worker manager");

    let ctx = StageContext {
        api: ApiClient::new(api_base).expect("api client"),
        workers: Arc::new(workers),
        events: Arc::new(EventChannel::new("steward")),
        sessions: Arc::new(SessionStore::new(pool)),
        gate: PermissionGate::default(),
        worker_settings: WorkerSettings::default(),
        retry: RetryConfig {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        },
        worker_wait: Duration::from_millis(500),
        worker_poll: Duration::from_millis(5),
    };
    Harness { ctx, runtime }
}

/// A context pointing at an unreachable API, for tests that never call it.
#[must_use]
pub fn test_context() -> StageContext {
    harness("http://127.0.0.1:9").ctx
}
