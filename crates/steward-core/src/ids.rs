//! Branded identifier newtypes.
//!
//! IDs are UUID v7 strings wrapped in newtypes so a `WorkerId` can never be
//! passed where a `ThreadId` is expected. Serde serializes them transparently
//! as plain strings for wire compatibility.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! branded_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Generate a fresh ID (UUID v7, time-ordered).
            #[must_use]
            pub fn generate() -> Self {
                Self(Uuid::now_v7().to_string())
            }

            /// Wrap an existing identifier string.
            #[must_use]
            pub fn from_string(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// The raw string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_string())
            }
        }
    };
}

branded_id!(
    /// Stable key for one conversation thread's workflow state.
    ThreadId
);

branded_id!(
    /// Identifier for a spawned isolated execution unit.
    WorkerId
);

branded_id!(
    /// Opaque tracing token threaded through a workflow run.
    CorrelationId
);
