//! Settings loading: defaults → file → environment.

use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::SettingsError;
use crate::types::StewardSettings;

/// Deep-merge `overlay` into `base`. Objects merge recursively; everything
/// else is replaced by the overlay value.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        let _ = base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Load settings: compiled defaults, deep-merged with the optional JSON file
/// at `path`, then `STEWARD_*` env overrides on top.
pub fn load_settings(path: Option<&Path>) -> Result<StewardSettings, SettingsError> {
    let mut merged = serde_json::to_value(StewardSettings::default())?;

    if let Some(path) = path {
        if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            let file_value: Value = serde_json::from_str(&raw)?;
            deep_merge(&mut merged, file_value);
            debug!(path = %path.display(), "loaded settings file");
        } else {
            warn!(path = %path.display(), "settings file missing; using defaults");
        }
    }

    let mut settings: StewardSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings)?;
    Ok(settings)
}

fn apply_env_overrides(settings: &mut StewardSettings) -> Result<(), SettingsError> {
    if let Ok(addr) = std::env::var("STEWARD_BIND_ADDR") {
        settings.server.bind_addr = addr;
    }
    if let Ok(path) = std::env::var("STEWARD_DB_PATH") {
        settings.store.db_path = path;
    }
    if let Ok(url) = std::env::var("STEWARD_API_BASE_URL") {
        settings.api.base_url = url;
    }
    if let Ok(image) = std::env::var("STEWARD_WORKER_IMAGE") {
        settings.workers.image = image;
    }
    if let Ok(cap) = std::env::var("STEWARD_ITERATION_CAP") {
        settings.graph.iteration_cap =
            cap.parse().map_err(|_| SettingsError::InvalidEnv {
                var: "STEWARD_ITERATION_CAP".to_string(),
                value: cap,
            })?;
    }
    if let Ok(groups) = std::env::var("STEWARD_ALLOWED_TOOL_GROUPS") {
        settings.gate.allowed_tool_groups = groups
            .split(',')
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(ToString::to_string)
            .collect();
    }
    Ok(())
}
