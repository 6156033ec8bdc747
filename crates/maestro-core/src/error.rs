//! Error taxonomy for registry assembly, planning, and dispatch.

use std::collections::HashMap;
use thiserror::Error;

/// Registry assembly failure. Fatal to the dispatch being built, not to
/// the process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("capability {namespace}.{name} is already registered")]
    Duplicate { namespace: String, name: String },
}

/// Failure of the injected step ranker (upstream inference error).
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RankError {
    message: String,
}

impl RankError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Plan construction failed because the ranking delegate itself errored.
/// Zero usable candidates is not a planning error.
#[derive(Debug, Error)]
#[error("plan construction failed: {source}")]
pub struct PlanningError {
    #[from]
    source: RankError,
}

/// Uniform failure surface of [`crate::Dispatcher::dispatch`].
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Registry assembly hit a duplicate `(namespace, name)`.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The planning delegate failed; surfaced to the caller as bad input.
    #[error(transparent)]
    Planning(#[from] PlanningError),

    /// A required capability (a plan step or the fallback) was not present
    /// in the registry.
    #[error("capability {namespace}.{name} not found")]
    NotFound { namespace: String, name: String },

    /// A step failed during execution. Carries the failing step's identity
    /// and the partial context variables for diagnostics.
    #[error("capability {namespace}.{name} failed: {message}")]
    Capability {
        namespace: String,
        name: String,
        message: String,
        variables: HashMap<String, String>,
    },

    /// Invalid static configuration (e.g. empty goal template).
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl DispatchError {
    /// Stable kind label for wire serialization and status mapping.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Registry(_) => "duplicate_capability",
            Self::Planning(_) => "planning_error",
            Self::NotFound { .. } => "not_found",
            Self::Capability { .. } => "capability_failure",
            Self::Configuration(_) => "configuration_error",
        }
    }
}
