//! Sparse state updates and per-field reducers.
//!
//! Every graph node returns a [`StatePatch`] — only the fields it touched.
//! [`WorkflowState::apply`] merges a patch into the canonical state:
//!
//! - **Scalars** (`current_project`, `project_spec`, `project_intent`,
//!   `awaiting_user_response`, `is_continuation`): last write wins.
//! - **Capability tags**: set union — commutative and idempotent, so
//!   re-delivered or out-of-order updates converge to the same set.
//! - **Messages and errors**: append in completion order, no dedup. Generic
//!   lists deliberately get the same plain-append reducer; no runtime type
//!   inspection.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::{ChatMessage, ProjectIntent, ProjectRef, ProjectSpec, WorkflowState};

/// A sparse set of field updates returned by a stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatePatch {
    /// Replace the current project reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_project: Option<ProjectRef>,
    /// Replace the project spec.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_spec: Option<ProjectSpec>,
    /// Replace the pending intent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_intent: Option<ProjectIntent>,
    /// Set the awaiting-user flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub awaiting_user_response: Option<bool>,
    /// Set the continuation flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_continuation: Option<bool>,
    /// Capability tags to union into the active set.
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub capabilities: BTreeSet<String>,
    /// Messages to append.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<ChatMessage>,
    /// Errors to append.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl StatePatch {
    /// An empty patch (merging it is a no-op).
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Patch setting the project spec.
    #[must_use]
    pub fn with_spec(mut self, spec: ProjectSpec) -> Self {
        self.project_spec = Some(spec);
        self
    }

    /// Patch setting the pending intent.
    #[must_use]
    pub fn with_intent(mut self, intent: ProjectIntent) -> Self {
        self.project_intent = Some(intent);
        self
    }

    /// Patch setting the current project.
    #[must_use]
    pub fn with_project(mut self, project: ProjectRef) -> Self {
        self.current_project = Some(project);
        self
    }

    /// Append a message.
    #[must_use]
    pub fn with_message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    /// Append an error string.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.errors.push(error.into());
        self
    }

    /// Union a capability tag into the patch.
    #[must_use]
    pub fn with_capability(mut self, tag: impl Into<String>) -> Self {
        let _ = self.capabilities.insert(tag.into());
        self
    }

    /// Set the awaiting-user flag.
    #[must_use]
    pub fn with_awaiting_user(mut self, awaiting: bool) -> Self {
        self.awaiting_user_response = Some(awaiting);
        self
    }

    /// True if the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl WorkflowState {
    /// Merge a sparse patch into this state using the per-field reducers.
    pub fn apply(&mut self, patch: StatePatch) {
        if let Some(project) = patch.current_project {
            self.current_project = Some(project);
        }
        if let Some(spec) = patch.project_spec {
            self.project_spec = Some(spec);
        }
        if let Some(intent) = patch.project_intent {
            self.project_intent = Some(intent);
        }
        if let Some(awaiting) = patch.awaiting_user_response {
            self.awaiting_user_response = awaiting;
        }
        if let Some(cont) = patch.is_continuation {
            self.is_continuation = cont;
        }
        self.capabilities.extend(patch.capabilities);
        self.messages.extend(patch.messages);
        self.errors.extend(patch.errors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MessageRole, WorkflowState};
    use proptest::prelude::*;
    use steward_core::ThreadId;

    fn state() -> WorkflowState {
        WorkflowState::new(ThreadId::from_string("t1"), "c1", "u1")
    }

    #[test]
    fn empty_patch_is_noop() {
        let mut s = state();
        let before = s.clone();
        s.apply(StatePatch::none());
        assert_eq!(s, before);
    }

    #[test]
    fn scalar_last_write_wins() {
        let mut s = state();
        s.apply(StatePatch::none().with_awaiting_user(true));
        s.apply(StatePatch::none().with_awaiting_user(false));
        assert!(!s.awaiting_user_response);
    }

    #[test]
    fn capabilities_collapse_duplicates() {
        let mut s = state();
        s.apply(StatePatch::none().with_capability("git").with_capability("net"));
        s.apply(StatePatch::none().with_capability("git"));
        assert_eq!(s.capabilities.len(), 2);
    }

    #[test]
    fn errors_preserve_order_without_dedup() {
        let mut s = state();
        s.apply(StatePatch::none().with_error("boom"));
        s.apply(StatePatch::none().with_error("bang").with_error("boom"));
        assert_eq!(s.errors, vec!["boom", "bang", "boom"]);
    }

    #[test]
    fn messages_append_in_completion_order() {
        let mut s = state();
        s.apply(StatePatch::none().with_message(ChatMessage::new(MessageRole::User, "a")));
        s.apply(StatePatch::none().with_message(ChatMessage::new(MessageRole::Assistant, "b")));
        let contents: Vec<_> = s.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["a", "b"]);
    }

    proptest! {
        /// The merged capability set equals the union of all patches' tags,
        /// independent of delivery order.
        #[test]
        fn capability_union_is_order_independent(
            tags in proptest::collection::vec(proptest::collection::btree_set("[a-z]{1,6}", 0..5), 0..6),
        ) {
            let mut forward = state();
            for set in &tags {
                forward.apply(StatePatch { capabilities: set.clone(), ..StatePatch::default() });
            }

            let mut reversed = state();
            for set in tags.iter().rev() {
                reversed.apply(StatePatch { capabilities: set.clone(), ..StatePatch::default() });
            }

            let expected: std::collections::BTreeSet<String> =
                tags.iter().flatten().cloned().collect();
            prop_assert_eq!(&forward.capabilities, &expected);
            prop_assert_eq!(&reversed.capabilities, &expected);
        }

        /// Re-delivering the same capability patch is idempotent.
        #[test]
        fn capability_union_is_idempotent(
            set in proptest::collection::btree_set("[a-z]{1,6}", 0..8),
        ) {
            let mut once = state();
            once.apply(StatePatch { capabilities: set.clone(), ..StatePatch::default() });

            let mut twice = state();
            twice.apply(StatePatch { capabilities: set.clone(), ..StatePatch::default() });
            twice.apply(StatePatch { capabilities: set, ..StatePatch::default() });

            prop_assert_eq!(once.capabilities, twice.capabilities);
        }
    }
}
