//! The per-thread workflow state store.
//!
//! Holds exactly one live [`WorkflowState`] per thread. All mutation goes
//! through [`StateStore::apply`], which takes the thread's lock, merges the
//! patch, and returns a snapshot — no component writes state directly.
//!
//! INVARIANT: per-thread writes are serialized by the entry mutex; concurrent
//! patches for the same thread merge in lock-acquisition (completion) order.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use steward_core::ThreadId;
use thiserror::Error;
use tracing::debug;

use crate::model::WorkflowState;
use crate::patch::StatePatch;

/// Errors from the state store.
#[derive(Debug, Error)]
pub enum StateStoreError {
    /// No live state for the given thread.
    #[error("no workflow state for thread {0}")]
    UnknownThread(ThreadId),
}

/// In-memory store of live workflow states, keyed by thread.
///
/// States are retained for resumption until [`StateStore::close`] — never
/// deleted automatically.
#[derive(Default)]
pub struct StateStore {
    threads: DashMap<ThreadId, Arc<Mutex<WorkflowState>>>,
}

impl StateStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the state for a thread, creating it on first access.
    ///
    /// A pre-existing state is marked as a continuation: the thread is
    /// resuming a prior conversation.
    pub fn get_or_create(
        &self,
        thread_id: &ThreadId,
        chat_id: &str,
        user_id: &str,
    ) -> WorkflowState {
        if let Some(entry) = self.threads.get(thread_id) {
            let mut state = entry.lock();
            state.is_continuation = true;
            return state.clone();
        }
        let state = WorkflowState::new(thread_id.clone(), chat_id, user_id);
        debug!(thread_id = %thread_id, "created workflow state");
        let _ = self
            .threads
            .insert(thread_id.clone(), Arc::new(Mutex::new(state.clone())));
        state
    }

    /// Merge a patch into a thread's state and return the merged snapshot.
    pub fn apply(
        &self,
        thread_id: &ThreadId,
        patch: StatePatch,
    ) -> Result<WorkflowState, StateStoreError> {
        let entry = self
            .threads
            .get(thread_id)
            .ok_or_else(|| StateStoreError::UnknownThread(thread_id.clone()))?;
        let mut state = entry.lock();
        state.apply(patch);
        Ok(state.clone())
    }

    /// Overwrite a thread's state wholesale (used by the engine to commit a
    /// finished run, including control-field updates).
    pub fn replace(&self, state: WorkflowState) {
        let _ = self
            .threads
            .insert(state.thread_id.clone(), Arc::new(Mutex::new(state)));
    }

    /// Snapshot a thread's state, if live.
    #[must_use]
    pub fn get(&self, thread_id: &ThreadId) -> Option<WorkflowState> {
        self.threads.get(thread_id).map(|e| e.lock().clone())
    }

    /// Explicitly close a thread, dropping its state. Returns whether a
    /// state existed.
    pub fn close(&self, thread_id: &ThreadId) -> bool {
        self.threads.remove(thread_id).is_some()
    }

    /// Number of live threads.
    #[must_use]
    pub fn len(&self) -> usize {
        self.threads.len()
    }

    /// Whether no threads are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn first_access_creates_state() {
        let store = StateStore::new();
        let tid = ThreadId::from_string("t1");
        let state = store.get_or_create(&tid, "c1", "u1");
        assert!(!state.is_continuation);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn second_access_marks_continuation() {
        let store = StateStore::new();
        let tid = ThreadId::from_string("t1");
        let _ = store.get_or_create(&tid, "c1", "u1");
        let resumed = store.get_or_create(&tid, "c1", "u1");
        assert!(resumed.is_continuation);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn apply_unknown_thread_errors() {
        let store = StateStore::new();
        let err = store
            .apply(&ThreadId::from_string("missing"), StatePatch::none())
            .unwrap_err();
        assert_matches!(err, StateStoreError::UnknownThread(_));
    }

    #[test]
    fn apply_merges_and_snapshots() {
        let store = StateStore::new();
        let tid = ThreadId::from_string("t1");
        let _ = store.get_or_create(&tid, "c1", "u1");

        let merged = store
            .apply(&tid, StatePatch::none().with_capability("git"))
            .unwrap();
        assert!(merged.capabilities.contains("git"));

        // The snapshot reflects the store of record.
        assert!(store.get(&tid).unwrap().capabilities.contains("git"));
    }

    #[test]
    fn close_is_explicit_and_final() {
        let store = StateStore::new();
        let tid = ThreadId::from_string("t1");
        let _ = store.get_or_create(&tid, "c1", "u1");

        assert!(store.close(&tid));
        assert!(!store.close(&tid));
        assert!(store.get(&tid).is_none());
    }

    #[test]
    fn concurrent_patches_all_land() {
        let store = Arc::new(StateStore::new());
        let tid = ThreadId::from_string("t1");
        let _ = store.get_or_create(&tid, "c1", "u1");

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                let tid = tid.clone();
                std::thread::spawn(move || {
                    store
                        .apply(&tid, StatePatch::none().with_capability(format!("cap{i}")))
                        .unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(store.get(&tid).unwrap().capabilities.len(), 8);
    }
}
