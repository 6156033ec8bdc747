//! Plan: the ordered capability-invocation sequence for one goal, plus the
//! degenerate-plan filter.

use crate::registry::CapabilityRegistry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One planned invocation: a capability reference plus pre-bound input
/// overrides applied to the context before the capability runs.
/// Immutable once part of a [`Plan`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    pub namespace: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: BTreeMap<String, String>,
}

impl PlanStep {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            inputs: BTreeMap::new(),
        }
    }

    pub fn with_input(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.inputs.insert(key.into(), value.into());
        self
    }

    /// `namespace.name` label for logs and error messages.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }
}

/// Identity of a designated capability (fallback, final renderer) in
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRef {
    pub namespace: String,
    pub name: String,
}

impl StepRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn matches(&self, step: &PlanStep) -> bool {
        self.namespace == step.namespace && self.name == step.name
    }
}

/// Ordered, immutable invocation sequence for a goal.
///
/// Serializes to the goal string plus an ordered list of
/// `{namespace, name, inputs}` records and reconstructs identically.
/// Filtering returns a new plan; the original is never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    goal: String,
    steps: Vec<PlanStep>,
}

impl Plan {
    pub fn new(goal: impl Into<String>, steps: Vec<PlanStep>) -> Self {
        Self {
            goal: goal.into(),
            steps,
        }
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Degenerate-plan filter. Drops steps with an empty name and steps
    /// whose resolved capability is a no-op placeholder; then, when
    /// exactly one step remains and it is the designated final renderer,
    /// drops that too — a plan consisting solely of a terminal formatting
    /// step carries no informational action and is treated as empty.
    ///
    /// Deterministic, order-preserving for retained steps, and idempotent.
    pub fn filtered(&self, registry: &CapabilityRegistry, final_renderer: &StepRef) -> Plan {
        let mut steps: Vec<PlanStep> = self
            .steps
            .iter()
            .filter(|step| !step.name.is_empty())
            .filter(|step| {
                registry
                    .lookup(&step.namespace, &step.name)
                    .map(|capability| !capability.is_noop())
                    .unwrap_or(true)
            })
            .cloned()
            .collect();

        if steps.len() == 1 && final_renderer.matches(&steps[0]) {
            tracing::debug!(
                step = %steps[0].qualified_name(),
                "dropping lone terminal renderer step"
            );
            steps.clear();
        }

        Plan {
            goal: self.goal.clone(),
            steps,
        }
    }
}
