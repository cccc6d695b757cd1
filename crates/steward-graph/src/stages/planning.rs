//! Technical planning.

use async_trait::async_trait;
use steward_api::with_retry;
use steward_core::events::progress_event;
use steward_state::{Complexity, ProjectRef, StatePatch, WorkflowState};
use tracing::{info, instrument};

use crate::errors::GraphError;
use crate::node::{Node, NodeName, StageContext};

/// At or above this many captured requirements, take the full path.
const COMPLEX_REQUIREMENT_COUNT: usize = 3;

const COMPLEX_KEYWORDS: &[&str] = &[
    "integrate",
    "migrate",
    "migration",
    "distributed",
    "pipeline",
    "realtime",
    "real-time",
    "multi-tenant",
];

/// Classify complexity and register the project with the persistence API.
///
/// Registration is retried per the configured policy; a response without an
/// `id` is a stage failure because every later stage keys on it.
#[derive(Default)]
pub struct Planning;

fn classify_complexity(requirements: &[String], summary: &str) -> Complexity {
    let lower = summary.to_lowercase();
    if requirements.len() >= COMPLEX_REQUIREMENT_COUNT
        || COMPLEX_KEYWORDS.iter().any(|kw| lower.contains(kw))
    {
        Complexity::Complex
    } else {
        Complexity::Simple
    }
}

#[async_trait]
impl Node for Planning {
    fn name(&self) -> NodeName {
        NodeName::Planning
    }

    #[instrument(skip_all, fields(thread_id = %state.thread_id))]
    async fn run(
        &self,
        state: &WorkflowState,
        ctx: &StageContext,
    ) -> Result<StatePatch, GraphError> {
        let mut spec = state
            .project_spec
            .clone()
            .ok_or_else(|| GraphError::stage(self.name(), "no project spec captured"))?;
        spec.complexity = Some(classify_complexity(&spec.requirements, &spec.summary));

        let created = with_retry(ctx.retry, || ctx.api.create_project(&spec.name, &spec.summary))
            .await
            .map_err(|e| GraphError::stage(self.name(), e))?;
        let id = created["id"]
            .as_str()
            .ok_or_else(|| GraphError::stage(self.name(), "project response missing id"))?
            .to_string();
        let name = created["name"].as_str().unwrap_or(&spec.name).to_string();
        info!(project_id = %id, complexity = ?spec.complexity, "project registered");

        ctx.events.publish(progress_event(
            state.thread_id.as_str(),
            &format!("planned project {name}"),
        ));
        Ok(StatePatch::none()
            .with_spec(spec)
            .with_project(ProjectRef { id, name })
            .with_capability("version-control"))
    }
}
