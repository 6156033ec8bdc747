//! End-to-end dispatch paths exercised with deterministic ranker doubles:
//! fallback on empty or degenerate plans, ordered execution with context
//! threading, first-failure stop, and credential-gated registration.

use maestro_core::{
    Capability, CapabilityDescriptor, CandidateStep, ConditionalSkillSet, DispatchContext,
    DispatchError, DispatchRequest, Dispatcher, DispatcherConfig, RankError, SkillError, SkillSet,
    StepRanker, RESULT_KEY,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Ranker double returning a fixed candidate list.
struct FixedRanker(Vec<CandidateStep>);

#[async_trait::async_trait]
impl StepRanker for FixedRanker {
    async fn rank(
        &self,
        _goal: &str,
        _capabilities: &[CapabilityDescriptor],
    ) -> Result<Vec<CandidateStep>, RankError> {
        Ok(self.0.clone())
    }
}

/// Ranker double that always fails, like an unreachable inference backend.
struct FailingRanker;

#[async_trait::async_trait]
impl StepRanker for FailingRanker {
    async fn rank(
        &self,
        _goal: &str,
        _capabilities: &[CapabilityDescriptor],
    ) -> Result<Vec<CandidateStep>, RankError> {
        Err(RankError::new("inference backend unreachable"))
    }
}

/// Test capability: counts invocations, marks a variable, optionally fails.
struct Probe {
    namespace: &'static str,
    name: &'static str,
    invocations: Arc<AtomicUsize>,
    fail_with: Option<&'static str>,
}

impl Probe {
    fn new(namespace: &'static str, name: &'static str) -> (Arc<Self>, Arc<AtomicUsize>) {
        let invocations = Arc::new(AtomicUsize::new(0));
        let probe = Arc::new(Self {
            namespace,
            name,
            invocations: Arc::clone(&invocations),
            fail_with: None,
        });
        (probe, invocations)
    }

    fn failing(
        namespace: &'static str,
        name: &'static str,
        message: &'static str,
    ) -> (Arc<Self>, Arc<AtomicUsize>) {
        let invocations = Arc::new(AtomicUsize::new(0));
        let probe = Arc::new(Self {
            namespace,
            name,
            invocations: Arc::clone(&invocations),
            fail_with: Some(message),
        });
        (probe, invocations)
    }
}

#[async_trait::async_trait]
impl Capability for Probe {
    fn namespace(&self) -> &str {
        self.namespace
    }

    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "test probe"
    }

    async fn invoke(&self, ctx: &mut DispatchContext) -> Result<(), SkillError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.fail_with {
            return Err(message.into());
        }
        ctx.set(format!("ran:{}.{}", self.namespace, self.name), "yes");
        ctx.set(RESULT_KEY, format!("{}.{} done", self.namespace, self.name));
        Ok(())
    }
}

/// Skill set wrapping a list of prebuilt capabilities.
struct ProbeSet {
    namespace: &'static str,
    capabilities: Vec<Arc<dyn Capability>>,
}

impl SkillSet for ProbeSet {
    fn namespace(&self) -> &str {
        self.namespace
    }

    fn capabilities(&self) -> Vec<Arc<dyn Capability>> {
        self.capabilities.clone()
    }
}

fn dispatcher_with(
    ranker: Arc<dyn StepRanker>,
    static_sets: Vec<Arc<dyn SkillSet>>,
    conditional_sets: Vec<ConditionalSkillSet>,
) -> Dispatcher {
    Dispatcher::new(DispatcherConfig::default(), ranker, static_sets, conditional_sets)
        .expect("default config is valid")
}

/// Static set containing the fallback (`chat.respond`) plus a probe
/// renderer under the default `text.render` identity.
fn baseline_sets() -> (Vec<Arc<dyn SkillSet>>, Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let (fallback, fallback_count) = Probe::new("chat", "respond");
    let (renderer, renderer_count) = Probe::new("text", "render");
    let sets: Vec<Arc<dyn SkillSet>> = vec![
        Arc::new(ProbeSet {
            namespace: "chat",
            capabilities: vec![fallback],
        }),
        Arc::new(ProbeSet {
            namespace: "text",
            capabilities: vec![renderer],
        }),
    ];
    (sets, fallback_count, renderer_count)
}

#[tokio::test]
async fn empty_plan_invokes_fallback_directly() {
    let (sets, fallback_count, _) = baseline_sets();
    let dispatcher = dispatcher_with(Arc::new(FixedRanker(vec![])), sets, vec![]);

    let outcome = dispatcher
        .dispatch(DispatchRequest::new("anything"))
        .await
        .unwrap();

    assert_eq!(fallback_count.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.output, "chat.respond done");
}

#[tokio::test]
async fn lone_renderer_plan_falls_back() {
    let (sets, fallback_count, renderer_count) = baseline_sets();
    let ranker = Arc::new(FixedRanker(vec![CandidateStep::new("text", "render")]));
    let dispatcher = dispatcher_with(ranker, sets, vec![]);

    dispatcher
        .dispatch(DispatchRequest::new("just render"))
        .await
        .unwrap();

    assert_eq!(renderer_count.load(Ordering::SeqCst), 0);
    assert_eq!(fallback_count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn substantive_plan_executes_in_order_and_skips_fallback() {
    let (sets, fallback_count, renderer_count) = baseline_sets();
    let (worker, worker_count) = Probe::new("tickets", "open");
    let mut sets = sets;
    sets.push(Arc::new(ProbeSet {
        namespace: "tickets",
        capabilities: vec![worker],
    }));

    let ranker = Arc::new(FixedRanker(vec![
        CandidateStep::new("tickets", "open"),
        CandidateStep::new("text", "render"),
    ]));
    let dispatcher = dispatcher_with(ranker, sets, vec![]);

    let outcome = dispatcher
        .dispatch(DispatchRequest::new("open a ticket"))
        .await
        .unwrap();

    assert_eq!(worker_count.load(Ordering::SeqCst), 1);
    assert_eq!(renderer_count.load(Ordering::SeqCst), 1);
    assert_eq!(fallback_count.load(Ordering::SeqCst), 0);
    // renderer ran last
    assert_eq!(outcome.output, "text.render done");
    assert_eq!(outcome.variables.get("ran:tickets.open").map(String::as_str), Some("yes"));
}

#[tokio::test]
async fn failure_stops_execution_and_preserves_partial_context() {
    let (sets, _, _) = baseline_sets();
    let (first, first_count) = Probe::new("steps", "one");
    let (second, _) = Probe::failing("steps", "two", "boom");
    let (third, third_count) = Probe::new("steps", "three");
    let mut sets = sets;
    sets.push(Arc::new(ProbeSet {
        namespace: "steps",
        capabilities: vec![first, second, third],
    }));

    let ranker = Arc::new(FixedRanker(vec![
        CandidateStep::new("steps", "one"),
        CandidateStep::new("steps", "two"),
        CandidateStep::new("steps", "three"),
    ]));
    let dispatcher = dispatcher_with(ranker, sets, vec![]);

    let err = dispatcher
        .dispatch(DispatchRequest::new("three step goal"))
        .await
        .unwrap_err();

    assert_eq!(first_count.load(Ordering::SeqCst), 1);
    assert_eq!(third_count.load(Ordering::SeqCst), 0);
    match err {
        DispatchError::Capability {
            namespace,
            name,
            message,
            variables,
        } => {
            assert_eq!((namespace.as_str(), name.as_str()), ("steps", "two"));
            assert_eq!(message, "boom");
            // step one's mutation survives in the diagnostic snapshot
            assert_eq!(variables.get("ran:steps.one").map(String::as_str), Some("yes"));
        }
        other => panic!("expected capability failure, got {other:?}"),
    }
}

#[tokio::test]
async fn step_input_overrides_are_applied_before_invocation() {
    let (sets, _, _) = baseline_sets();
    let ranker = Arc::new(FixedRanker(vec![
        CandidateStep {
            namespace: "text".to_string(),
            name: "render".to_string(),
            inputs: [("style".to_string(), "plain".to_string())].into(),
        },
        CandidateStep::new("chat", "respond"),
    ]));
    let dispatcher = dispatcher_with(ranker, sets, vec![]);

    let outcome = dispatcher
        .dispatch(DispatchRequest::new("render then respond"))
        .await
        .unwrap();

    assert_eq!(outcome.variables.get("style").map(String::as_str), Some("plain"));
}

#[tokio::test]
async fn credential_gates_integration_visibility() {
    let (sets, fallback_count, _) = baseline_sets();
    let conditional = ConditionalSkillSet::new("tickets", |credential| {
        assert_eq!(credential, "secret-token");
        let (capability, _) = Probe::new("tickets", "open");
        Arc::new(ProbeSet {
            namespace: "tickets",
            capabilities: vec![capability],
        }) as Arc<dyn SkillSet>
    });
    let ranker = Arc::new(FixedRanker(vec![CandidateStep::new("tickets", "open")]));
    let dispatcher = dispatcher_with(ranker, sets, vec![conditional]);

    // Without the credential the candidate cannot resolve: fallback runs.
    dispatcher
        .dispatch(DispatchRequest::new("open a ticket"))
        .await
        .unwrap();
    assert_eq!(fallback_count.load(Ordering::SeqCst), 1);

    // With the credential the integration step executes.
    let outcome = dispatcher
        .dispatch(DispatchRequest::new("open a ticket").with_credential("tickets", "secret-token"))
        .await
        .unwrap();
    assert_eq!(fallback_count.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.output, "tickets.open done");
}

#[tokio::test]
async fn missing_fallback_is_not_found() {
    let dispatcher = dispatcher_with(Arc::new(FixedRanker(vec![])), vec![], vec![]);
    let err = dispatcher
        .dispatch(DispatchRequest::new("anything"))
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::NotFound { .. }));
    assert_eq!(err.kind(), "not_found");
}

#[tokio::test]
async fn ranker_failure_surfaces_as_planning_error() {
    let (sets, fallback_count, _) = baseline_sets();
    let dispatcher = dispatcher_with(Arc::new(FailingRanker), sets, vec![]);
    let err = dispatcher
        .dispatch(DispatchRequest::new("anything"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "planning_error");
    assert_eq!(fallback_count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn duplicate_registration_is_fatal_to_the_dispatch() {
    let (first, _) = Probe::new("dup", "same");
    let (second, _) = Probe::new("dup", "same");
    let sets: Vec<Arc<dyn SkillSet>> = vec![
        Arc::new(ProbeSet {
            namespace: "dup",
            capabilities: vec![first],
        }),
        Arc::new(ProbeSet {
            namespace: "dup",
            capabilities: vec![second],
        }),
    ];
    let dispatcher = dispatcher_with(Arc::new(FixedRanker(vec![])), sets, vec![]);
    let err = dispatcher
        .dispatch(DispatchRequest::new("anything"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "duplicate_capability");
}
