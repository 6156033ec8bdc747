//! Plan construction: the injected step ranker plus validation and
//! bounding of the candidate list.

use crate::capability::CapabilityDescriptor;
use crate::error::{PlanningError, RankError};
use crate::plan::{Plan, PlanStep};
use crate::registry::CapabilityRegistry;
use crate::shared::DispatchContext;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One candidate invocation proposed by the ranking delegate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateStep {
    pub namespace: String,
    pub name: String,
    pub inputs: BTreeMap<String, String>,
}

impl CandidateStep {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            inputs: BTreeMap::new(),
        }
    }
}

impl From<CandidateStep> for PlanStep {
    fn from(candidate: CandidateStep) -> Self {
        PlanStep {
            namespace: candidate.namespace,
            name: candidate.name,
            inputs: candidate.inputs,
        }
    }
}

/// Ranking delegate: given a goal and the capability descriptors visible
/// to one dispatch, returns an ordered candidate list. Production
/// implementations are inference-backed; tests inject fixed doubles.
#[async_trait::async_trait]
pub trait StepRanker: Send + Sync {
    async fn rank(
        &self,
        goal: &str,
        capabilities: &[CapabilityDescriptor],
    ) -> Result<Vec<CandidateStep>, RankError>;
}

/// Builds a bounded, validated plan for a goal from the registry contents.
pub struct PlanBuilder {
    ranker: Arc<dyn StepRanker>,
    max_steps: usize,
}

impl PlanBuilder {
    pub fn new(ranker: Arc<dyn StepRanker>, max_steps: usize) -> Self {
        Self { ranker, max_steps }
    }

    /// Ranks, bounds the candidates to `max_steps`, and drops every
    /// candidate that does not resolve in the registry — a single
    /// hallucinated or unavailable step never aborts the dispatch. An
    /// empty step list is a valid "no actionable plan" result; the only
    /// error is the ranking delegate itself failing.
    pub async fn build(
        &self,
        goal: &str,
        registry: &CapabilityRegistry,
        ctx: &DispatchContext,
    ) -> Result<Plan, PlanningError> {
        tracing::debug!(
            goal,
            variables = ctx.variables().len(),
            capabilities = registry.len(),
            "building plan"
        );
        let candidates = self.ranker.rank(goal, &registry.descriptors()).await?;

        let mut steps = Vec::new();
        for candidate in candidates.into_iter().take(self.max_steps) {
            if registry.lookup(&candidate.namespace, &candidate.name).is_none() {
                tracing::warn!(
                    step = %format!("{}.{}", candidate.namespace, candidate.name),
                    "dropping candidate step that resolves to no capability"
                );
                continue;
            }
            steps.push(PlanStep::from(candidate));
        }
        Ok(Plan::new(goal, steps))
    }
}
