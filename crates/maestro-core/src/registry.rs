//! Per-dispatch capability registry, including credential-gated skill sets.

use crate::capability::{Capability, CapabilityDescriptor, SkillSet};
use crate::error::RegistryError;
use std::collections::HashMap;
use std::sync::Arc;

/// Factory for a credential-gated skill set: receives the per-request
/// credential and constructs the set it unlocks.
pub type SkillSetFactory = Box<dyn Fn(&str) -> Arc<dyn SkillSet> + Send + Sync>;

/// One opt-in integration: its skill set is constructed and registered
/// only when the dispatch request carries a credential under
/// `integration`. An explicit `(integration, factory)` list replaces
/// discovery-by-reflection.
pub struct ConditionalSkillSet {
    pub integration: String,
    factory: SkillSetFactory,
}

impl ConditionalSkillSet {
    pub fn new(
        integration: impl Into<String>,
        factory: impl Fn(&str) -> Arc<dyn SkillSet> + Send + Sync + 'static,
    ) -> Self {
        Self {
            integration: integration.into(),
            factory: Box::new(factory),
        }
    }
}

/// Set of capabilities visible to one dispatch.
///
/// Built fresh per request and discarded with it; lookup on
/// `(namespace, name)` is O(1). Registration order does not affect lookup.
#[derive(Default)]
pub struct CapabilityRegistry {
    namespaces: HashMap<String, HashMap<String, Arc<dyn Capability>>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a single capability. Fails when `(namespace, name)` is
    /// already present.
    pub fn register(&mut self, capability: Arc<dyn Capability>) -> Result<(), RegistryError> {
        let namespace = capability.namespace().to_string();
        let name = capability.name().to_string();
        let entries = self.namespaces.entry(namespace.clone()).or_default();
        if entries.contains_key(&name) {
            return Err(RegistryError::Duplicate { namespace, name });
        }
        entries.insert(name, capability);
        Ok(())
    }

    /// Registers every capability of a skill set.
    pub fn register_set(&mut self, set: &dyn SkillSet) -> Result<(), RegistryError> {
        for capability in set.capabilities() {
            self.register(capability)?;
        }
        Ok(())
    }

    /// Evaluates one conditional entry: an absent credential silently
    /// skips registration; a present one constructs and registers the set.
    pub fn register_if(
        &mut self,
        credential: Option<&str>,
        conditional: &ConditionalSkillSet,
    ) -> Result<(), RegistryError> {
        let Some(credential) = credential else {
            tracing::debug!(
                integration = %conditional.integration,
                "credential absent; integration not registered"
            );
            return Ok(());
        };
        let set = (conditional.factory)(credential);
        self.register_set(set.as_ref())
    }

    /// Looks up a capability by `(namespace, name)`.
    pub fn lookup(&self, namespace: &str, name: &str) -> Option<Arc<dyn Capability>> {
        self.namespaces.get(namespace)?.get(name).cloned()
    }

    /// Descriptors of every registered capability, sorted by
    /// `(namespace, name)` so planner input is deterministic.
    pub fn descriptors(&self) -> Vec<CapabilityDescriptor> {
        let mut out: Vec<CapabilityDescriptor> = self
            .namespaces
            .values()
            .flat_map(|entries| entries.values())
            .map(|capability| CapabilityDescriptor::of(capability.as_ref()))
            .collect();
        out.sort_by(|a, b| (&a.namespace, &a.name).cmp(&(&b.namespace, &b.name)));
        out
    }

    /// Number of registered capabilities.
    pub fn len(&self) -> usize {
        self.namespaces.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::NoOpCapability;

    struct FixedSet;

    impl SkillSet for FixedSet {
        fn namespace(&self) -> &str {
            "fixed"
        }

        fn capabilities(&self) -> Vec<Arc<dyn Capability>> {
            vec![
                Arc::new(NoOpCapability::new("fixed", "one")),
                Arc::new(NoOpCapability::new("fixed", "two")),
            ]
        }
    }

    #[test]
    fn register_then_lookup_returns_same_instance() {
        let mut registry = CapabilityRegistry::new();
        let capability: Arc<dyn Capability> = Arc::new(NoOpCapability::new("ns", "fn"));
        registry.register(Arc::clone(&capability)).unwrap();
        let found = registry.lookup("ns", "fn").expect("registered capability");
        assert!(Arc::ptr_eq(&capability, &found));
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut registry = CapabilityRegistry::new();
        registry
            .register(Arc::new(NoOpCapability::new("ns", "fn")))
            .unwrap();
        let err = registry
            .register(Arc::new(NoOpCapability::new("ns", "fn")))
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::Duplicate {
                namespace: "ns".to_string(),
                name: "fn".to_string()
            }
        );
    }

    #[test]
    fn conditional_registration_gated_on_credential() {
        let conditional =
            ConditionalSkillSet::new("fixed", |_credential| Arc::new(FixedSet) as Arc<dyn SkillSet>);

        let mut without = CapabilityRegistry::new();
        without.register_if(None, &conditional).unwrap();
        assert!(without.lookup("fixed", "one").is_none());

        let mut with = CapabilityRegistry::new();
        with.register_if(Some("token-123"), &conditional).unwrap();
        assert!(with.lookup("fixed", "one").is_some());
        assert!(with.lookup("fixed", "two").is_some());
    }

    #[test]
    fn descriptors_sorted() {
        let mut registry = CapabilityRegistry::new();
        registry
            .register(Arc::new(NoOpCapability::new("b", "z")))
            .unwrap();
        registry
            .register(Arc::new(NoOpCapability::new("a", "y")))
            .unwrap();
        registry
            .register(Arc::new(NoOpCapability::new("a", "x")))
            .unwrap();
        let names: Vec<String> = registry
            .descriptors()
            .iter()
            .map(CapabilityDescriptor::qualified_name)
            .collect();
        assert_eq!(names, ["a.x", "a.y", "b.z"]);
    }
}
