//! Declarative worker launch configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use steward_core::ValidationError;

use crate::capability::Capability;

/// Which kind of agent runs inside the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentType {
    /// Writes and tests application code.
    #[serde(rename = "code-generation-agent")]
    CodeGeneration,
    /// Provisions and remediates infrastructure.
    #[serde(rename = "infra-agent")]
    Infra,
}

impl AgentType {
    /// Wire-format string.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CodeGeneration => "code-generation-agent",
            Self::Infra => "infra-agent",
        }
    }
}

impl std::fmt::Display for AgentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Launch configuration consumed by the lifecycle manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerConfig {
    /// Human-readable unit name.
    pub name: String,
    /// Agent kind to run.
    pub agent_type: AgentType,
    /// Declared capabilities, composed into the launch plan.
    pub capabilities: Vec<Capability>,
    /// Tool groups the agent may invoke.
    pub allowed_tools: Vec<String>,
    /// Extra environment, merged over capability-contributed env.
    pub env_vars: BTreeMap<String, String>,
    /// Whether the unit gets outbound network access.
    pub has_internet: bool,
    /// Time-to-live before the sweeper reclaims the unit.
    pub ttl_hours: u32,
    /// Per-task execution timeout.
    pub timeout_minutes: u32,
}

impl WorkerConfig {
    /// A minimal config for the given agent type.
    #[must_use]
    pub fn new(name: impl Into<String>, agent_type: AgentType) -> Self {
        Self {
            name: name.into(),
            agent_type,
            capabilities: Vec::new(),
            allowed_tools: Vec::new(),
            env_vars: BTreeMap::new(),
            has_internet: false,
            ttl_hours: 4,
            timeout_minutes: 30,
        }
    }

    /// Declare a capability.
    #[must_use]
    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.push(capability);
        self
    }

    /// Add an environment variable.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.env_vars.insert(key.into(), value.into());
        self
    }

    /// Enable outbound network access.
    #[must_use]
    pub fn with_internet(mut self) -> Self {
        self.has_internet = true;
        self
    }

    /// Reject malformed configs before any provisioning work happens.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::new("name", "must not be empty"));
        }
        if self.timeout_minutes == 0 {
            return Err(ValidationError::new("timeoutMinutes", "must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accumulates() {
        let config = WorkerConfig::new("builder-1", AgentType::CodeGeneration)
            .with_capability(Capability::VersionControl)
            .with_env("REPO", "git://example")
            .with_internet();
        assert_eq!(config.capabilities, vec![Capability::VersionControl]);
        assert_eq!(config.env_vars["REPO"], "git://example");
        assert!(config.has_internet);
    }

    #[test]
    fn empty_name_is_rejected() {
        let config = WorkerConfig::new("  ", AgentType::Infra);
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut config = WorkerConfig::new("w", AgentType::Infra);
        config.timeout_minutes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn agent_type_wire_format() {
        let json = serde_json::to_string(&AgentType::CodeGeneration).unwrap();
        assert_eq!(json, "\"code-generation-agent\"");
        let json = serde_json::to_string(&AgentType::Infra).unwrap();
        assert_eq!(json, "\"infra-agent\"");
    }
}
