//! Dispatch orchestration: registry assembly, plan build, degenerate-plan
//! filtering, and sequential step execution with fallback.

use crate::capability::{CapabilityDescriptor, SkillSet};
use crate::config::DispatcherConfig;
use crate::error::DispatchError;
use crate::planner::{PlanBuilder, StepRanker};
use crate::registry::{CapabilityRegistry, ConditionalSkillSet};
use crate::shared::{DispatchContext, DispatchOutcome, DispatchRequest, RESULT_KEY};
use std::collections::HashMap;
use std::sync::Arc;

/// Orchestration entry point.
///
/// One `Dispatcher` is shared across concurrent requests; everything
/// mutable — registry, context, plan — is constructed per dispatch, so no
/// cross-request locking is needed. The dispatcher imposes no timeout of
/// its own: callers wrap [`dispatch`](Self::dispatch) in their own
/// timeout, and dropping the future aborts the capability that is
/// currently executing without invoking the remaining steps.
pub struct Dispatcher {
    static_sets: Vec<Arc<dyn SkillSet>>,
    conditional_sets: Vec<ConditionalSkillSet>,
    builder: PlanBuilder,
    config: DispatcherConfig,
}

impl Dispatcher {
    /// Builds a dispatcher from validated static configuration, the
    /// injected ranking delegate, the always-available skill sets, and the
    /// credential-gated `(integration, factory)` list.
    pub fn new(
        config: DispatcherConfig,
        ranker: Arc<dyn StepRanker>,
        static_sets: Vec<Arc<dyn SkillSet>>,
        conditional_sets: Vec<ConditionalSkillSet>,
    ) -> Result<Self, DispatchError> {
        config.validate().map_err(DispatchError::Configuration)?;
        let builder = PlanBuilder::new(ranker, config.max_plan_steps);
        Ok(Self {
            static_sets,
            conditional_sets,
            builder,
            config,
        })
    }

    /// Descriptors of the unconditionally registered capabilities (the
    /// ones visible without any credential).
    pub fn static_descriptors(&self) -> Vec<CapabilityDescriptor> {
        let mut out: Vec<CapabilityDescriptor> = self
            .static_sets
            .iter()
            .flat_map(|set| set.capabilities())
            .map(|capability| CapabilityDescriptor::of(capability.as_ref()))
            .collect();
        out.sort_by(|a, b| (&a.namespace, &a.name).cmp(&(&b.namespace, &b.name)));
        out
    }

    /// Runs one dispatch: assemble registry, build and filter the plan,
    /// then execute it in order — or invoke the fallback capability when
    /// nothing actionable remains. All capability errors are converted to
    /// structured failures here; none propagate as unhandled faults.
    pub async fn dispatch(
        &self,
        request: DispatchRequest,
    ) -> Result<DispatchOutcome, DispatchError> {
        let registry = self.build_registry(&request.credentials)?;
        let mut ctx = DispatchContext::new(request.goal.clone(), request.variables);
        let goal = self.config.goal_for(&request.goal);

        let plan = match self.builder.build(&goal, &registry, &ctx).await {
            Ok(plan) => plan,
            Err(err) => {
                tracing::warn!(
                    correlation_id = request.correlation_id.as_deref().unwrap_or("-"),
                    error = %err,
                    "plan construction failed"
                );
                return Err(err.into());
            }
        };
        let plan = plan.filtered(&registry, &self.config.final_renderer);

        if plan.is_empty() {
            tracing::info!(
                correlation_id = request.correlation_id.as_deref().unwrap_or("-"),
                "no actionable plan; invoking fallback capability"
            );
            self.invoke_step(
                &registry,
                &self.config.fallback.namespace,
                &self.config.fallback.name,
                &mut ctx,
            )
            .await?;
            return Ok(Self::outcome(ctx));
        }

        for step in plan.steps() {
            for (key, value) in &step.inputs {
                ctx.set(key.clone(), value.clone());
            }
            self.invoke_step(&registry, &step.namespace, &step.name, &mut ctx)
                .await?;
        }
        Ok(Self::outcome(ctx))
    }

    /// Assembles the per-request registry: static sets first, then each
    /// conditional set whose integration has a credential on the request.
    /// A duplicate `(namespace, name)` anywhere is fatal to the dispatch.
    fn build_registry(
        &self,
        credentials: &HashMap<String, String>,
    ) -> Result<CapabilityRegistry, DispatchError> {
        let mut registry = CapabilityRegistry::new();
        for set in &self.static_sets {
            registry.register_set(set.as_ref())?;
        }
        for conditional in &self.conditional_sets {
            let credential = credentials
                .get(&conditional.integration)
                .map(String::as_str);
            registry.register_if(credential, conditional)?;
        }
        Ok(registry)
    }

    /// Resolves and invokes one capability, converting its error into a
    /// structured failure that preserves the partial context variables.
    async fn invoke_step(
        &self,
        registry: &CapabilityRegistry,
        namespace: &str,
        name: &str,
        ctx: &mut DispatchContext,
    ) -> Result<(), DispatchError> {
        let capability =
            registry
                .lookup(namespace, name)
                .ok_or_else(|| DispatchError::NotFound {
                    namespace: namespace.to_string(),
                    name: name.to_string(),
                })?;
        tracing::debug!(step = %format!("{}.{}", namespace, name), "invoking capability");
        if let Err(err) = capability.invoke(ctx).await {
            tracing::warn!(
                step = %format!("{}.{}", namespace, name),
                error = %err,
                "capability failed"
            );
            return Err(DispatchError::Capability {
                namespace: namespace.to_string(),
                name: name.to_string(),
                message: err.to_string(),
                variables: ctx.snapshot(),
            });
        }
        Ok(())
    }

    fn outcome(ctx: DispatchContext) -> DispatchOutcome {
        let output = ctx.get(RESULT_KEY).unwrap_or_default().to_string();
        DispatchOutcome {
            output,
            variables: ctx.variables().clone(),
        }
    }
}
