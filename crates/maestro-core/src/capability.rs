//! Capability trait, descriptors, and the skill-set provider interface.

use crate::shared::DispatchContext;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Error type returned by capability implementations. Converted into a
/// structured [`crate::DispatchError::Capability`] at the dispatcher
/// boundary; never allowed to escape a request handler.
pub type SkillError = Box<dyn std::error::Error + Send + Sync>;

/// A named, invocable unit of work operating on a [`DispatchContext`].
#[async_trait::async_trait]
pub trait Capability: Send + Sync {
    /// Namespace the capability is registered under (e.g. "chat").
    fn namespace(&self) -> &str;

    /// Function name within the namespace (e.g. "respond").
    fn name(&self) -> &str;

    /// Natural-language description fed to the step ranker.
    fn description(&self) -> &str;

    /// Placeholder capabilities report true and are dropped by plan
    /// filtering.
    fn is_noop(&self) -> bool {
        false
    }

    /// Executes the capability, mutating the context in place. Expected to
    /// set [`crate::RESULT_KEY`] at minimum.
    async fn invoke(&self, ctx: &mut DispatchContext) -> Result<(), SkillError>;
}

/// Descriptor advertised to the planning delegate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    pub namespace: String,
    pub name: String,
    pub description: String,
}

impl CapabilityDescriptor {
    pub fn of(capability: &dyn Capability) -> Self {
        Self {
            namespace: capability.namespace().to_string(),
            name: capability.name().to_string(),
            description: capability.description().to_string(),
        }
    }

    /// `namespace.name` label for prompts and logs.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }
}

/// A provider of capabilities sharing one namespace ("skill set").
/// Registration adds every capability the set exposes.
pub trait SkillSet: Send + Sync {
    fn namespace(&self) -> &str;
    fn capabilities(&self) -> Vec<Arc<dyn Capability>>;
}

/// Placeholder capability: does nothing when invoked and is removed by
/// plan filtering before execution.
pub struct NoOpCapability {
    namespace: String,
    name: String,
}

impl NoOpCapability {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

#[async_trait::async_trait]
impl Capability for NoOpCapability {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Placeholder step with no effect"
    }

    fn is_noop(&self) -> bool {
        true
    }

    async fn invoke(&self, _ctx: &mut DispatchContext) -> Result<(), SkillError> {
        Ok(())
    }
}
