//! Steward orchestrator binary.
//!
//! `steward serve` wires the stores, worker manager, event channel, graph
//! engine, and HTTP surface together and runs until SIGINT/SIGTERM.
//! `steward check-gate` checks a tool group against the configured permission
//! gate, mapping a denial to a non-zero exit.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use steward_api::ApiClient;
use steward_core::RetryConfig;
use steward_events::EventChannel;
use steward_graph::{GraphRunner, StageContext};
use steward_server::{AppState, Dispatcher, metrics, router};
use steward_settings::{GraphSettings, PermissionGate, WorkerSettings, load_settings};
use steward_state::StateStore;
use steward_store::{SessionStore, StatusStore, new_pool, run_migrations};
use steward_workers::{DockerCli, WorkerManager};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "steward", about = "Multi-agent workflow orchestrator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the orchestrator server.
    Serve {
        /// Settings file (JSON). Defaults + env overrides apply either way.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the listen address.
        #[arg(long)]
        bind: Option<String>,
    },
    /// Check a tool group against the configured permission gate.
    CheckGate {
        /// Tool group to check.
        tool_group: String,

        /// Settings file (JSON).
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Serve { config, bind } => {
            serve(config.as_deref(), bind).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::CheckGate { tool_group, config } => check_gate(config.as_deref(), &tool_group),
    }
}

fn check_gate(config: Option<&Path>, tool_group: &str) -> Result<ExitCode> {
    let settings = load_settings(config)?;
    let gate = PermissionGate::new(settings.gate.allowed_tool_groups);
    match gate.check(tool_group) {
        Ok(()) => {
            println!("allowed: {tool_group}");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{e}");
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn serve(config: Option<&Path>, bind: Option<String>) -> Result<()> {
    let settings = load_settings(config)?;
    let bind_addr = bind.unwrap_or_else(|| settings.server.bind_addr.clone());
    let metrics_handle = metrics::install_recorder();

    let pool = new_pool(Path::new(&settings.store.db_path))
        .with_context(|| format!("opening {}", settings.store.db_path))?;
    run_migrations(&*pool.get()?)?;

    let status = Arc::new(StatusStore::new(pool.clone()));
    let sessions = Arc::new(SessionStore::with_ttl(pool, settings.store.session_ttl_secs));
    let events = Arc::new(EventChannel::new(settings.graph.events_prefix.clone()));
    let workers = Arc::new(WorkerManager::new(Arc::new(DockerCli::new()), status)?);

    let shutdown = CancellationToken::new();
    let sweep_interval = Duration::from_secs(settings.workers.sweep_interval_secs);
    let worker_sweeper = workers.spawn_sweeper(sweep_interval, shutdown.clone());
    let session_sweeper = sessions.spawn_sweeper(sweep_interval, shutdown.clone());

    let ctx = StageContext {
        api: ApiClient::new(&settings.api.base_url)?,
        workers: Arc::clone(&workers),
        events: Arc::clone(&events),
        sessions: Arc::clone(&sessions),
        gate: PermissionGate::new(settings.gate.allowed_tool_groups.clone()),
        worker_settings: settings.workers.clone(),
        retry: RetryConfig {
            max_attempts: settings.api.max_attempts,
            ..RetryConfig::default()
        },
        worker_wait: worker_wait_budget(&settings.workers, &settings.graph),
        worker_poll: Duration::from_secs(2),
    };
    let runner = GraphRunner::new(ctx, &settings.graph);
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::new(StateStore::new()),
        events,
        runner,
        settings.server.max_concurrent_runs,
    ));

    let app = router(AppState {
        dispatcher: Arc::clone(&dispatcher),
        metrics: metrics_handle,
    });
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;
    info!(%bind_addr, "steward listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_signal())
        .await?;

    info!("shutting down");
    dispatcher.shutdown();
    shutdown.cancel();
    for sweeper in [worker_sweeper, session_sweeper] {
        if let Err(e) = sweeper.await {
            warn!(error = %e, "sweeper task did not exit cleanly");
        }
    }
    Ok(())
}

/// Time reserved inside the stage timeout for worker teardown.
const TEARDOWN_MARGIN: Duration = Duration::from_secs(30);

/// How long a stage may wait on its worker.
///
/// INVARIANT: the wait resolves inside the stage timeout. A wait that
/// outlives the stage gets cancelled by the engine mid-await, the stage's
/// teardown never runs, and the worker lingers until the TTL sweep.
fn worker_wait_budget(workers: &WorkerSettings, graph: &GraphSettings) -> Duration {
    let configured = Duration::from_secs(u64::from(workers.default_timeout_minutes) * 60);
    let ceiling = Duration::from_secs(graph.stage_timeout_secs).saturating_sub(TEARDOWN_MARGIN);
    configured.min(ceiling)
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
        }
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                let _ = signal.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to listen for sigterm"),
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
