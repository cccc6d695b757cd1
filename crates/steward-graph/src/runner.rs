//! Execute-merge-route loop with an iteration cap.

use std::time::Duration;

use metrics::counter;
use steward_core::metrics::{
    GRAPH_CAP_TERMINATIONS_TOTAL, GRAPH_STAGE_FAILURES_TOTAL, GRAPH_STAGES_TOTAL,
};
use steward_settings::GraphSettings;
use steward_state::{StatePatch, WorkflowState};
use tracing::{error, info, instrument, warn};

use crate::errors::GraphError;
use crate::node::{Next, NodeName, NodeSet, StageContext};
use crate::routing;
use crate::stages::Stages;

/// Per-decision-point routing function.
pub type Router = fn(NodeName, &WorkflowState) -> Next;

/// Drives one workflow run: execute the current node, merge its patch,
/// route, repeat until a terminal marker or the iteration cap.
///
/// Every run terminates: the topology's only cycles pass through decision
/// points, and `iteration_count` is bumped on every pass, so the cap bounds
/// the loop regardless of routing outcomes.
pub struct GraphRunner {
    ctx: StageContext,
    nodes: Box<dyn NodeSet>,
    router: Router,
    iteration_cap: u32,
    stage_timeout: Duration,
}

impl GraphRunner {
    /// Runner over the production stage set and topology.
    #[must_use]
    pub fn new(ctx: StageContext, settings: &GraphSettings) -> Self {
        Self::with_nodes(
            ctx,
            Box::new(Stages::new()),
            routing::route,
            settings.iteration_cap,
            Duration::from_secs(settings.stage_timeout_secs),
        )
    }

    /// Runner over a caller-supplied stage set and router.
    #[must_use]
    pub fn with_nodes(
        ctx: StageContext,
        nodes: Box<dyn NodeSet>,
        router: Router,
        iteration_cap: u32,
        stage_timeout: Duration,
    ) -> Self {
        Self {
            ctx,
            nodes,
            router,
            iteration_cap,
            stage_timeout,
        }
    }

    /// Run the graph from intake to termination and return the final state.
    ///
    /// A stage error is appended to the state's error accumulator and routed
    /// to the failure exit, never retried. An error inside the failure exit
    /// itself ends the run. This function never fails: the worst outcome is
    /// a final state whose `errors` explain what went wrong.
    #[instrument(skip_all, fields(thread_id = %state.thread_id, correlation_id = %state.correlation_id))]
    pub async fn run(&self, mut state: WorkflowState) -> WorkflowState {
        // The cap bounds a single run; a resumed thread starts fresh.
        state.iteration_count = 0;
        let mut current = NodeName::Intake;
        loop {
            let outcome = self.execute(current, &state).await;
            state.iteration_count += 1;

            match outcome {
                Ok(patch) => {
                    state.apply(patch);
                    if state.iteration_count >= self.iteration_cap {
                        warn!(
                            node = %current,
                            cap = self.iteration_cap,
                            "iteration cap reached, forcing termination"
                        );
                        counter!(GRAPH_CAP_TERMINATIONS_TOTAL).increment(1);
                        break;
                    }
                    match (self.router)(current, &state) {
                        Next::Node(next) => current = next,
                        Next::End => break,
                    }
                }
                Err(err) => {
                    error!(node = %current, error = %err, "stage failed");
                    counter!(GRAPH_STAGE_FAILURES_TOTAL, "node" => current.as_str())
                        .increment(1);
                    state.apply(StatePatch::none().with_error(err.to_string()));
                    if current == NodeName::FailureExit
                        || state.iteration_count >= self.iteration_cap
                    {
                        break;
                    }
                    current = NodeName::FailureExit;
                }
            }
        }
        info!(
            iterations = state.iteration_count,
            errors = state.errors.len(),
            "run complete"
        );
        state
    }

    async fn execute(
        &self,
        name: NodeName,
        state: &WorkflowState,
    ) -> Result<StatePatch, GraphError> {
        let node = self.nodes.node(name);
        counter!(GRAPH_STAGES_TOTAL, "node" => name.as_str()).increment(1);
        match tokio::time::timeout(self.stage_timeout, node.run(state, &self.ctx)).await {
            Ok(result) => result,
            Err(_) => Err(GraphError::Timeout {
                node: name,
                secs: self.stage_timeout.as_secs(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use steward_core::ThreadId;
    use steward_state::WorkflowState;

    use crate::node::Node;
    use crate::stages::testutil::test_context;

    struct StubNode {
        name: NodeName,
        calls: Arc<AtomicU32>,
        fail: bool,
    }

    #[async_trait]
    impl Node for StubNode {
        fn name(&self) -> NodeName {
            self.name
        }

        async fn run(
            &self,
            _state: &WorkflowState,
            _ctx: &StageContext,
        ) -> Result<StatePatch, GraphError> {
            let _ = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(GraphError::stage(self.name, "stub failure"))
            } else {
                Ok(StatePatch::none())
            }
        }
    }

    struct StubSet {
        intake: StubNode,
        failure_exit: StubNode,
    }

    impl NodeSet for StubSet {
        fn node(&self, name: NodeName) -> &dyn Node {
            match name {
                NodeName::FailureExit => &self.failure_exit,
                _ => &self.intake,
            }
        }
    }

    fn stub_set(intake_fails: bool, exit_fails: bool) -> (StubSet, Arc<AtomicU32>, Arc<AtomicU32>) {
        let intake_calls = Arc::new(AtomicU32::new(0));
        let exit_calls = Arc::new(AtomicU32::new(0));
        let set = StubSet {
            intake: StubNode {
                name: NodeName::Intake,
                calls: Arc::clone(&intake_calls),
                fail: intake_fails,
            },
            failure_exit: StubNode {
                name: NodeName::FailureExit,
                calls: Arc::clone(&exit_calls),
                fail: exit_fails,
            },
        };
        (set, intake_calls, exit_calls)
    }

    fn always_continue(_current: NodeName, _state: &WorkflowState) -> Next {
        Next::Node(NodeName::Intake)
    }

    fn state() -> WorkflowState {
        WorkflowState::new(ThreadId::from_string("t1"), "c1", "u1")
    }

    #[tokio::test]
    async fn iteration_cap_forces_termination() {
        let (set, intake_calls, _) = stub_set(false, false);
        let runner = GraphRunner::with_nodes(
            test_context(),
            Box::new(set),
            always_continue,
            20,
            Duration::from_secs(5),
        );

        let final_state = runner.run(state()).await;
        assert_eq!(final_state.iteration_count, 20);
        assert_eq!(intake_calls.load(Ordering::SeqCst), 20);
    }

    #[tokio::test]
    async fn stage_error_routes_to_failure_exit() {
        let (set, intake_calls, exit_calls) = stub_set(true, false);
        let runner = GraphRunner::with_nodes(
            test_context(),
            Box::new(set),
            routing::route,
            20,
            Duration::from_secs(5),
        );

        let final_state = runner.run(state()).await;
        assert_eq!(intake_calls.load(Ordering::SeqCst), 1);
        assert_eq!(exit_calls.load(Ordering::SeqCst), 1);
        assert_eq!(final_state.errors.len(), 1);
        assert!(final_state.errors[0].contains("stub failure"));
    }

    #[tokio::test]
    async fn failure_exit_error_ends_the_run() {
        let (set, _, exit_calls) = stub_set(true, true);
        let runner = GraphRunner::with_nodes(
            test_context(),
            Box::new(set),
            routing::route,
            20,
            Duration::from_secs(5),
        );

        let final_state = runner.run(state()).await;
        assert_eq!(exit_calls.load(Ordering::SeqCst), 1);
        assert_eq!(final_state.errors.len(), 2);
    }

    #[tokio::test]
    async fn slow_stage_times_out() {
        struct SlowNode;

        #[async_trait]
        impl Node for SlowNode {
            fn name(&self) -> NodeName {
                NodeName::Intake
            }

            async fn run(
                &self,
                _state: &WorkflowState,
                _ctx: &StageContext,
            ) -> Result<StatePatch, GraphError> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(StatePatch::none())
            }
        }

        struct SlowSet {
            slow: SlowNode,
            exit: StubNode,
        }

        impl NodeSet for SlowSet {
            fn node(&self, name: NodeName) -> &dyn Node {
                match name {
                    NodeName::FailureExit => &self.exit,
                    _ => &self.slow,
                }
            }
        }

        let set = SlowSet {
            slow: SlowNode,
            exit: StubNode {
                name: NodeName::FailureExit,
                calls: Arc::new(AtomicU32::new(0)),
                fail: false,
            },
        };
        let runner = GraphRunner::with_nodes(
            test_context(),
            Box::new(set),
            routing::route,
            20,
            Duration::from_millis(50),
        );

        let final_state = runner.run(state()).await;
        assert_eq!(final_state.errors.len(), 1);
        assert!(final_state.errors[0].contains("timed out"));
    }
}
