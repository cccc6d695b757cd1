//! Settings error types.

use thiserror::Error;

/// Errors while loading or merging settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Settings file could not be read.
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file is not valid JSON or does not match the schema.
    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    /// An environment override had an unparseable value.
    #[error("invalid value for {var}: {value}")]
    InvalidEnv {
        /// The environment variable name.
        var: String,
        /// The offending value.
        value: String,
    },
}
