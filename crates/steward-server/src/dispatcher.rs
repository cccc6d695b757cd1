//! Per-thread run dispatcher.
//!
//! One active graph run per conversation thread, with a semaphore capping
//! total concurrency across threads. Runs for distinct threads proceed fully
//! in parallel; a second message for a busy thread is rejected, not queued.

use std::collections::HashMap;
use std::sync::Arc;

use metrics::gauge;
use parking_lot::Mutex;
use steward_core::events::response_event;
use steward_core::{CorrelationId, ThreadId};
use steward_events::EventChannel;
use steward_graph::GraphRunner;
use steward_state::{ChatMessage, MessageRole, StatePatch, StateStore};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::errors::ServerError;
use crate::messages::{InboundMessage, OutboundMessage};
use crate::metrics::AGENT_RUNS_ACTIVE;

const FALLBACK_RESPONSE: &str = "The run finished without producing a response.";

/// Tracks an active graph run for a thread.
struct ActiveRun {
    run_id: CorrelationId,
    cancel: CancellationToken,
    /// RAII guard — released when the run is removed from `active_runs`.
    _permit: OwnedSemaphorePermit,
}

/// Multi-thread run coordinator.
pub struct Dispatcher {
    state: Arc<StateStore>,
    events: Arc<EventChannel>,
    runner: GraphRunner,
    max_concurrent_runs: usize,
    /// Semaphore limiting total concurrent graph runs.
    run_semaphore: Arc<Semaphore>,
    /// Active runs keyed by thread ID.
    active_runs: Mutex<HashMap<String, ActiveRun>>,
}

impl Dispatcher {
    /// Create a dispatcher with the given concurrency cap.
    #[must_use]
    pub fn new(
        state: Arc<StateStore>,
        events: Arc<EventChannel>,
        runner: GraphRunner,
        max_concurrent_runs: usize,
    ) -> Self {
        Self {
            state,
            events,
            runner,
            max_concurrent_runs,
            run_semaphore: Arc::new(Semaphore::new(max_concurrent_runs)),
            active_runs: Mutex::new(HashMap::new()),
        }
    }

    /// Start tracking a run for a thread. Returns the `CancellationToken`.
    ///
    /// Errors if:
    /// - The thread already has an active run (`ThreadBusy`)
    /// - The server is at max concurrent runs (`ServerBusy`)
    #[instrument(skip(self), fields(thread_id, run_id = %run_id))]
    pub fn start_run(
        &self,
        thread_id: &str,
        run_id: &CorrelationId,
    ) -> Result<CancellationToken, ServerError> {
        let mut runs = self.active_runs.lock();
        if runs.contains_key(thread_id) {
            return Err(ServerError::ThreadBusy(thread_id.to_string()));
        }
        // Acquire a concurrency permit (non-blocking).
        let permit = Arc::clone(&self.run_semaphore)
            .try_acquire_owned()
            .map_err(|_| ServerError::ServerBusy {
                current: runs.len(),
                max: self.max_concurrent_runs,
            })?;
        let cancel = CancellationToken::new();
        let _ = runs.insert(
            thread_id.to_string(),
            ActiveRun {
                run_id: run_id.clone(),
                cancel: cancel.clone(),
                _permit: permit,
            },
        );
        gauge!(AGENT_RUNS_ACTIVE).set(runs.len() as f64);
        info!(thread_id, "run started");
        Ok(cancel)
    }

    /// Stop tracking a run (removes from active tracking).
    #[instrument(skip(self), fields(thread_id))]
    pub fn complete_run(&self, thread_id: &str) {
        debug!(thread_id, "run completed");
        let mut runs = self.active_runs.lock();
        let _ = runs.remove(thread_id);
        gauge!(AGENT_RUNS_ACTIVE).set(runs.len() as f64);
    }

    /// The run ID for an active thread, if any.
    #[must_use]
    pub fn active_run_id(&self, thread_id: &str) -> Option<CorrelationId> {
        self.active_runs
            .lock()
            .get(thread_id)
            .map(|r| r.run_id.clone())
    }

    /// Number of active runs.
    #[must_use]
    pub fn active_run_count(&self) -> usize {
        self.active_runs.lock().len()
    }

    /// Number of live conversation threads.
    #[must_use]
    pub fn live_thread_count(&self) -> usize {
        self.state.len()
    }

    /// Abort a thread's active run by cancelling its token. Returns whether
    /// a run was cancelled.
    #[instrument(skip(self), fields(thread_id))]
    pub fn abort(&self, thread_id: &str) -> bool {
        let runs = self.active_runs.lock();
        if let Some(run) = runs.get(thread_id) {
            warn!(thread_id, "abort requested");
            run.cancel.cancel();
            true
        } else {
            false
        }
    }

    /// Cancel every active run. New runs are still accepted; callers stop
    /// offering them once the listener is down.
    pub fn shutdown(&self) {
        let runs = self.active_runs.lock();
        info!(active = runs.len(), "cancelling active runs");
        for run in runs.values() {
            run.cancel.cancel();
        }
    }

    /// Handle one inbound user message end to end.
    ///
    /// Loads (or creates) the thread state, appends the user message, runs
    /// the graph, commits the final state, and returns the outbound response.
    /// The response is also published as a `response` event under the
    /// caller's callback channel when one is given.
    #[instrument(skip(self, msg), fields(user_id = %msg.user_id))]
    pub async fn handle_message(
        &self,
        msg: InboundMessage,
    ) -> Result<OutboundMessage, ServerError> {
        let thread_id = ThreadId::from_string(&msg.user_id);
        let run_id = CorrelationId::generate();
        let cancel = self.start_run(thread_id.as_str(), &run_id)?;
        let result = self.run_thread(&thread_id, &msg, &cancel).await;
        self.complete_run(thread_id.as_str());
        result
    }

    async fn run_thread(
        &self,
        thread_id: &ThreadId,
        msg: &InboundMessage,
        cancel: &CancellationToken,
    ) -> Result<OutboundMessage, ServerError> {
        let chat_id = msg.callback_channel.as_deref().unwrap_or(msg.user_id.as_str());
        let _ = self.state.get_or_create(thread_id, chat_id, &msg.user_id);
        let state = self.state.apply(
            thread_id,
            StatePatch::none()
                .with_message(ChatMessage::new(MessageRole::User, msg.prompt.clone())),
        )?;

        let final_state = tokio::select! {
            state = self.runner.run(state) => state,
            () = cancel.cancelled() => {
                return Err(ServerError::Aborted(thread_id.clone()));
            }
        };
        let is_final = !final_state.awaiting_user_response;
        let text = final_state
            .messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::Assistant)
            .map_or_else(|| FALLBACK_RESPONSE.to_string(), |m| m.content.clone());
        self.state.replace(final_state);

        if let Some(channel) = msg.callback_channel.as_deref() {
            self.events.publish(response_event(channel, &text, is_final));
        }
        Ok(OutboundMessage {
            user_id: msg.user_id.clone(),
            text,
            is_final,
        })
    }
}
