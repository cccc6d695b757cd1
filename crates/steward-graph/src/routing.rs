//! Pure routing functions.
//!
//! Routing is pure (no side effects) and total: every reachable state shape,
//! including missing fields, maps to a documented default. Unset complexity
//! routes to the full implementation path and unset intent routes to
//! requirements capture — fail toward more scrutiny, not less.

use steward_state::{Complexity, IntentKind, StageStatus, WorkflowState};

use crate::node::{Next, NodeName};

/// The compile-time topology: routing after `current`, given merged state.
#[must_use]
pub fn route(current: NodeName, state: &WorkflowState) -> Next {
    match current {
        NodeName::Intake => route_after_intake(state),
        NodeName::Requirements => route_after_requirements(state),
        NodeName::Planning => route_after_planning(state),
        NodeName::Implementation => route_after_implementation(state),
        NodeName::DeployPrep => Next::Node(NodeName::Deployment),
        NodeName::Deployment | NodeName::Remediation | NodeName::FailureExit => Next::End,
    }
}

/// After classification: `deploy` routes straight to remediation/provisioning;
/// incidents likewise; questions end the run (the response was already sent);
/// builds — and anything unclassified — go to requirements capture.
#[must_use]
pub fn route_after_intake(state: &WorkflowState) -> Next {
    match state.project_intent.as_ref().map(|i| i.kind) {
        Some(IntentKind::Deploy | IntentKind::Incident) => Next::Node(NodeName::Remediation),
        Some(IntentKind::Question) => Next::End,
        Some(IntentKind::Build) | None => Next::Node(NodeName::Requirements),
    }
}

/// After requirements capture: pause when the stage is waiting on the user,
/// otherwise continue to planning.
#[must_use]
pub fn route_after_requirements(state: &WorkflowState) -> Next {
    if state.awaiting_user_response {
        Next::End
    } else {
        Next::Node(NodeName::Planning)
    }
}

/// After planning: `simple` takes the lightweight deploy-prep path; `complex`
/// — and unset — take the full implementation path.
#[must_use]
pub fn route_after_planning(state: &WorkflowState) -> Next {
    let complexity = state.project_spec.as_ref().and_then(|s| s.complexity);
    match complexity {
        Some(Complexity::Simple) => Next::Node(NodeName::DeployPrep),
        Some(Complexity::Complex) | None => Next::Node(NodeName::Implementation),
    }
}

/// After implementation:
/// - done with allocated resources → deployment
/// - done with nothing allocated → end (nothing to deploy)
/// - blocked pending approval → end, surfacing the reason — never a retry
/// - anything else → the failure exit
#[must_use]
pub fn route_after_implementation(state: &WorkflowState) -> Next {
    let Some(spec) = state.project_spec.as_ref() else {
        return Next::Node(NodeName::FailureExit);
    };
    match spec.status {
        Some(StageStatus::Done) if !spec.allocated_resources.is_empty() => {
            Next::Node(NodeName::Deployment)
        }
        Some(StageStatus::Done | StageStatus::Blocked) => Next::End,
        _ => Next::Node(NodeName::FailureExit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use steward_core::ThreadId;
    use steward_state::{ProjectIntent, ProjectSpec};

    fn state() -> WorkflowState {
        WorkflowState::new(ThreadId::from_string("t1"), "c1", "u1")
    }

    fn state_with_spec(spec: ProjectSpec) -> WorkflowState {
        let mut s = state();
        s.project_spec = Some(spec);
        s
    }

    #[test]
    fn deploy_intent_routes_to_remediation() {
        let mut s = state();
        s.project_intent = Some(ProjectIntent {
            kind: IntentKind::Deploy,
            description: "deploy the api".to_string(),
        });
        assert_eq!(route_after_intake(&s), Next::Node(NodeName::Remediation));
    }

    #[test]
    fn build_intent_routes_to_requirements() {
        let mut s = state();
        s.project_intent = Some(ProjectIntent {
            kind: IntentKind::Build,
            description: "build a thing".to_string(),
        });
        assert_eq!(route_after_intake(&s), Next::Node(NodeName::Requirements));
    }

    #[test]
    fn missing_intent_defaults_to_requirements() {
        assert_eq!(
            route_after_intake(&state()),
            Next::Node(NodeName::Requirements)
        );
    }

    #[test]
    fn simple_complexity_takes_lightweight_path() {
        let s = state_with_spec(ProjectSpec {
            complexity: Some(Complexity::Simple),
            ..ProjectSpec::default()
        });
        assert_eq!(route_after_planning(&s), Next::Node(NodeName::DeployPrep));
    }

    #[test]
    fn complex_complexity_takes_implementation_path() {
        let s = state_with_spec(ProjectSpec {
            complexity: Some(Complexity::Complex),
            ..ProjectSpec::default()
        });
        assert_eq!(
            route_after_planning(&s),
            Next::Node(NodeName::Implementation)
        );
    }

    #[test]
    fn unset_complexity_fails_toward_scrutiny() {
        let s = state_with_spec(ProjectSpec::default());
        assert_eq!(
            route_after_planning(&s),
            Next::Node(NodeName::Implementation)
        );
        // Even a missing spec takes the full path.
        assert_eq!(
            route_after_planning(&state()),
            Next::Node(NodeName::Implementation)
        );
    }

    #[test]
    fn done_with_resources_routes_to_deployment() {
        let mut spec = ProjectSpec {
            status: Some(StageStatus::Done),
            ..ProjectSpec::default()
        };
        let _ = spec
            .allocated_resources
            .insert("x".to_string(), json!(1));
        let s = state_with_spec(spec);
        assert_eq!(
            route_after_implementation(&s),
            Next::Node(NodeName::Deployment)
        );
    }

    #[test]
    fn done_without_resources_terminates() {
        let s = state_with_spec(ProjectSpec {
            status: Some(StageStatus::Done),
            ..ProjectSpec::default()
        });
        assert_eq!(route_after_implementation(&s), Next::End);
    }

    #[test]
    fn blocked_terminates_without_retry() {
        let s = state_with_spec(ProjectSpec {
            status: Some(StageStatus::Blocked),
            approval_reason: Some("budget approval required".to_string()),
            ..ProjectSpec::default()
        });
        assert_eq!(route_after_implementation(&s), Next::End);
    }

    #[test]
    fn unset_status_routes_to_failure_exit() {
        let s = state_with_spec(ProjectSpec::default());
        assert_eq!(
            route_after_implementation(&s),
            Next::Node(NodeName::FailureExit)
        );
        assert_eq!(
            route_after_implementation(&state()),
            Next::Node(NodeName::FailureExit)
        );
    }

    #[test]
    fn awaiting_user_pauses_after_requirements() {
        let mut s = state();
        s.awaiting_user_response = true;
        assert_eq!(route_after_requirements(&s), Next::End);

        s.awaiting_user_response = false;
        assert_eq!(route_after_requirements(&s), Next::Node(NodeName::Planning));
    }

    #[test]
    fn terminal_nodes_end() {
        assert_eq!(route(NodeName::Deployment, &state()), Next::End);
        assert_eq!(route(NodeName::Remediation, &state()), Next::End);
        assert_eq!(route(NodeName::FailureExit, &state()), Next::End);
    }
}
