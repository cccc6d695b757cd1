//! Composable worker capabilities.
//!
//! A capability is one unit of worker setup: the packages it needs installed,
//! the setup commands to run, and the environment it contributes. The set of
//! capabilities is closed — one variant per kind, registered in a static
//! compile-time table rather than a runtime-populated registry.
//!
//! Composition is order-insensitive except for declared dependencies
//! (`GitAuth` requires `VersionControl`); [`compose`] validates those and
//! fails fast with [`WorkerError::CapabilityConflict`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::errors::WorkerError;

/// A composable unit of worker setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// Git tooling.
    VersionControl,
    /// Authenticated git access (credential helper). Requires `VersionControl`.
    GitAuth,
    /// Outbound HTTP fetch tooling.
    NetworkFetch,
    /// Python interpreter runtime.
    InterpreterRuntime,
    /// Docker-in-docker for nested isolation.
    NestedIsolation,
}

impl Capability {
    /// Every variant, for registry completeness checks.
    pub const ALL: [Capability; 5] = [
        Capability::VersionControl,
        Capability::GitAuth,
        Capability::NetworkFetch,
        Capability::InterpreterRuntime,
        Capability::NestedIsolation,
    ];

    /// The kebab-case tag used in workflow state and launch configs.
    #[must_use]
    pub fn as_tag(self) -> &'static str {
        match self {
            Self::VersionControl => "version-control",
            Self::GitAuth => "git-auth",
            Self::NetworkFetch => "network-fetch",
            Self::InterpreterRuntime => "interpreter-runtime",
            Self::NestedIsolation => "nested-isolation",
        }
    }

    /// Parse a kebab-case tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_tag() == tag)
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// Static setup contributed by one capability.
#[derive(Debug)]
struct CapabilitySetup {
    capability: Capability,
    packages: &'static [&'static str],
    install_steps: &'static [&'static str],
    env: &'static [(&'static str, &'static str)],
    requires: &'static [Capability],
}

/// The static registration table. Keyed by enum variant; [`validate_registry`]
/// checks completeness at startup.
static REGISTRY: &[CapabilitySetup] = &[
    CapabilitySetup {
        capability: Capability::VersionControl,
        packages: &["git"],
        install_steps: &["git config --global init.defaultBranch main"],
        env: &[("GIT_TERMINAL_PROMPT", "0")],
        requires: &[],
    },
    CapabilitySetup {
        capability: Capability::GitAuth,
        packages: &[],
        install_steps: &["git config --global credential.helper store"],
        env: &[],
        requires: &[Capability::VersionControl],
    },
    CapabilitySetup {
        capability: Capability::NetworkFetch,
        packages: &["curl", "ca-certificates"],
        install_steps: &[],
        env: &[],
        requires: &[],
    },
    CapabilitySetup {
        capability: Capability::InterpreterRuntime,
        packages: &["python3", "python3-pip"],
        install_steps: &["python3 -m pip install --upgrade pip"],
        env: &[("PYTHONUNBUFFERED", "1")],
        requires: &[],
    },
    CapabilitySetup {
        capability: Capability::NestedIsolation,
        packages: &["docker.io"],
        install_steps: &[],
        env: &[("DOCKER_HOST", "unix:///var/run/docker.sock")],
        requires: &[],
    },
];

fn setup_for(capability: Capability) -> Result<&'static CapabilitySetup, WorkerError> {
    REGISTRY
        .iter()
        .find(|s| s.capability == capability)
        .ok_or(WorkerError::RegistryIncomplete(capability))
}

/// Startup invariant: every enum variant has a registration.
pub fn validate_registry() -> Result<(), WorkerError> {
    for capability in Capability::ALL {
        let _ = setup_for(capability)?;
    }
    Ok(())
}

/// Concrete launch setup composed from a capability declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchPlan {
    /// Packages to install, deduplicated and sorted.
    pub packages: Vec<String>,
    /// Setup commands, in canonical capability order.
    pub install_steps: Vec<String>,
    /// Environment variables contributed by capabilities.
    pub env: BTreeMap<String, String>,
}

/// Compose declared capabilities into a launch plan.
///
/// Input order is irrelevant: composition iterates the registry's canonical
/// order. Dependency validation fails fast before any setup is assembled.
pub fn compose(capabilities: &[Capability]) -> Result<LaunchPlan, WorkerError> {
    let declared: BTreeSet<Capability> = capabilities.iter().copied().collect();

    for &capability in &declared {
        let setup = setup_for(capability)?;
        for &requirement in setup.requires {
            if !declared.contains(&requirement) {
                return Err(WorkerError::CapabilityConflict {
                    capability,
                    requires: requirement,
                });
            }
        }
    }

    let mut plan = LaunchPlan::default();
    let mut packages = BTreeSet::new();
    for setup in REGISTRY {
        if !declared.contains(&setup.capability) {
            continue;
        }
        packages.extend(setup.packages.iter().map(ToString::to_string));
        plan.install_steps
            .extend(setup.install_steps.iter().map(ToString::to_string));
        plan.env.extend(
            setup
                .env
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string())),
        );
    }
    plan.packages = packages.into_iter().collect();
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn registry_is_complete() {
        validate_registry().unwrap();
    }

    #[test]
    fn tags_round_trip() {
        for capability in Capability::ALL {
            assert_eq!(Capability::from_tag(capability.as_tag()), Some(capability));
        }
        assert_eq!(Capability::from_tag("warp-drive"), None);
    }

    #[test]
    fn compose_unions_packages_without_duplicates() {
        let plan = compose(&[Capability::VersionControl, Capability::NetworkFetch]).unwrap();
        assert_eq!(plan.packages, vec!["ca-certificates", "curl", "git"]);
    }

    #[test]
    fn compose_is_order_insensitive() {
        let forward = compose(&[
            Capability::VersionControl,
            Capability::GitAuth,
            Capability::InterpreterRuntime,
        ])
        .unwrap();
        let reversed = compose(&[
            Capability::InterpreterRuntime,
            Capability::GitAuth,
            Capability::VersionControl,
        ])
        .unwrap();
        assert_eq!(forward, reversed);
    }

    #[test]
    fn compose_is_idempotent_over_duplicates() {
        let once = compose(&[Capability::NetworkFetch]).unwrap();
        let twice = compose(&[Capability::NetworkFetch, Capability::NetworkFetch]).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn git_auth_without_version_control_conflicts() {
        let err = compose(&[Capability::GitAuth]).unwrap_err();
        assert_matches!(
            err,
            WorkerError::CapabilityConflict {
                capability: Capability::GitAuth,
                requires: Capability::VersionControl,
            }
        );
    }

    #[test]
    fn git_auth_with_version_control_composes() {
        let plan = compose(&[Capability::GitAuth, Capability::VersionControl]).unwrap();
        // Version-control setup runs before the auth helper that needs it.
        assert_eq!(plan.install_steps.len(), 2);
        assert!(plan.install_steps[0].contains("defaultBranch"));
        assert!(plan.install_steps[1].contains("credential.helper"));
    }

    #[test]
    fn empty_declaration_composes_empty_plan() {
        let plan = compose(&[]).unwrap();
        assert!(plan.packages.is_empty());
        assert!(plan.install_steps.is_empty());
        assert!(plan.env.is_empty());
    }

    #[test]
    fn serde_uses_kebab_case() {
        let json = serde_json::to_string(&Capability::InterpreterRuntime).unwrap();
        assert_eq!(json, "\"interpreter-runtime\"");
    }
}
