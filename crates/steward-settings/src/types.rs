//! Settings schema: one struct per section, all with serde defaults so a
//! partial settings file deep-merges cleanly.

use serde::{Deserialize, Serialize};

/// Top-level settings container.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StewardSettings {
    /// HTTP server settings.
    pub server: ServerSettings,
    /// Storage settings.
    pub store: StoreSettings,
    /// Worker lifecycle settings.
    pub workers: WorkerSettings,
    /// Graph engine settings.
    pub graph: GraphSettings,
    /// Permission gate settings.
    pub gate: GateSettings,
    /// Persistence API collaborator settings.
    pub api: ApiSettings,
}

/// HTTP server settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Socket the axum server binds.
    pub bind_addr: String,
    /// Maximum concurrent workflow runs across all threads.
    pub max_concurrent_runs: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8700".to_string(),
            max_concurrent_runs: 32,
        }
    }
}

/// Storage settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreSettings {
    /// SQLite database path.
    pub db_path: String,
    /// Session TTL in seconds.
    pub session_ttl_secs: i64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            db_path: "steward.db".to_string(),
            session_ttl_secs: 7200,
        }
    }
}

/// Worker lifecycle settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkerSettings {
    /// Image booted for every worker.
    pub image: String,
    /// Default worker TTL in hours.
    pub default_ttl_hours: u32,
    /// TTL sweep interval in seconds.
    pub sweep_interval_secs: u64,
    /// Per-worker task timeout in minutes.
    pub default_timeout_minutes: u32,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            image: "steward/agent:latest".to_string(),
            default_ttl_hours: 4,
            sweep_interval_secs: 60,
            default_timeout_minutes: 30,
        }
    }
}

/// Graph engine settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GraphSettings {
    /// Hard cap on passes through decision points.
    pub iteration_cap: u32,
    /// Per-stage execution timeout in seconds.
    pub stage_timeout_secs: u64,
    /// Event channel name prefix.
    pub events_prefix: String,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            iteration_cap: 20,
            stage_timeout_secs: 600,
            events_prefix: "steward".to_string(),
        }
    }
}

/// Permission gate settings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GateSettings {
    /// Tool groups callers may invoke. Empty means allow all (fail-open by
    /// design — see [`crate::gate::PermissionGate`]).
    pub allowed_tool_groups: Vec<String>,
}

/// Persistence API settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiSettings {
    /// Base URL of the persistence API.
    pub base_url: String,
    /// Retry attempt cap for API calls.
    pub max_attempts: u32,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8600".to_string(),
            max_attempts: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let settings = StewardSettings::default();
        assert_eq!(settings.graph.iteration_cap, 20);
        assert_eq!(settings.store.session_ttl_secs, 7200);
        assert!(settings.gate.allowed_tool_groups.is_empty());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let settings: StewardSettings =
            serde_json::from_str(r#"{ "graph": { "iterationCap": 5 } }"#).unwrap();
        assert_eq!(settings.graph.iteration_cap, 5);
        assert_eq!(settings.graph.events_prefix, "steward");
        assert_eq!(settings.server, ServerSettings::default());
    }
}
