//! Shared error types.

use thiserror::Error;

/// Malformed input to a model or configuration object.
///
/// Aborts only the guarded command or stage; surfaced to the caller as a
/// structured rejection, never a process crash.
#[derive(Debug, Error)]
#[error("validation failed for {field}: {reason}")]
pub struct ValidationError {
    /// The field or parameter that failed validation.
    pub field: String,
    /// Human-readable reason.
    pub reason: String,
}

impl ValidationError {
    /// Build a validation error for a named field.
    #[must_use]
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
