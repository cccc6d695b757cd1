//! The Permission Gate: a static allow-list over capability/tool groups.
//!
//! An empty configured allow-list means **allow all**. That fail-open default
//! is deliberate and documented: an operator who configures no gate has not
//! opted into gating, and a surprise lock-out of every tool group would be
//! worse than no gate at all.

use thiserror::Error;

/// A tool group was rejected by the gate.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("permission denied for tool group '{tool_group}'")]
pub struct PermissionDenied {
    /// The rejected group.
    pub tool_group: String,
}

/// Gate outcome as a value, for callers that route on it instead of
/// propagating an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The group may be invoked.
    Allowed,
    /// The group was rejected, with a human-readable reason.
    Denied(String),
}

/// Static allow-list check over tool groups.
#[derive(Debug, Clone, Default)]
pub struct PermissionGate {
    allowed: Vec<String>,
}

impl PermissionGate {
    /// Build a gate from the configured allow-list.
    #[must_use]
    pub fn new(allowed: Vec<String>) -> Self {
        Self { allowed }
    }

    /// Whether a tool group may be invoked. Empty allow-list allows all.
    #[must_use]
    pub fn is_allowed(&self, tool_group: &str) -> bool {
        self.allowed.is_empty() || self.allowed.iter().any(|g| g == tool_group)
    }

    /// Signal rejection rather than silently no-op-ing. Callers wrapping
    /// command entry points translate this into a non-zero exit without
    /// executing the guarded action.
    pub fn check(&self, tool_group: &str) -> Result<(), PermissionDenied> {
        if self.is_allowed(tool_group) {
            Ok(())
        } else {
            Err(PermissionDenied {
                tool_group: tool_group.to_string(),
            })
        }
    }

    /// The gate outcome as a value.
    #[must_use]
    pub fn decide(&self, tool_group: &str) -> Decision {
        match self.check(tool_group) {
            Ok(()) => Decision::Allowed,
            Err(e) => Decision::Denied(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_allow_list_allows_everything() {
        let gate = PermissionGate::new(vec![]);
        assert!(gate.is_allowed("project"));
        assert!(gate.is_allowed("admin"));
        assert!(gate.check("anything").is_ok());
    }

    #[test]
    fn configured_list_denies_unlisted_groups() {
        let gate = PermissionGate::new(vec!["project".to_string()]);
        assert!(gate.is_allowed("project"));
        assert!(!gate.is_allowed("admin"));
    }

    #[test]
    fn check_signals_denied() {
        let gate = PermissionGate::new(vec!["project".to_string()]);
        let err = gate.check("admin").unwrap_err();
        assert_eq!(err.tool_group, "admin");
    }

    #[test]
    fn decide_returns_outcome_as_value() {
        let gate = PermissionGate::new(vec!["project".to_string()]);
        assert_eq!(gate.decide("project"), Decision::Allowed);
        match gate.decide("admin") {
            Decision::Denied(reason) => assert!(reason.contains("admin")),
            Decision::Allowed => panic!("expected denial"),
        }
    }
}
