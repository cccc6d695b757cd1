//! # steward-settings
//!
//! Configuration management with layered sources.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** — [`StewardSettings::default()`]
//! 2. **Settings file** — JSON, deep-merged over defaults
//! 3. **Environment variables** — `STEWARD_*` overrides (highest priority)
//!
//! There is no global singleton: the loaded value is passed into the
//! components that need it by the binary's composition root.
//!
//! The [`gate`] module holds the Permission Gate driven by
//! [`types::GateSettings::allowed_tool_groups`].

#![deny(unsafe_code)]

pub mod errors;
pub mod gate;
pub mod loader;
pub mod types;

pub use errors::SettingsError;
pub use gate::{Decision, PermissionDenied, PermissionGate};
pub use loader::{deep_merge, load_settings};
pub use types::*;
