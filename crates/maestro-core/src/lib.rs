//! maestro-core: goal-driven capability dispatch.
//!
//! A dispatch request carries a free-text goal and optional
//! per-integration credentials. The [`Dispatcher`] assembles a per-request
//! [`CapabilityRegistry`] (static skill sets plus credential-gated ones),
//! asks the injected [`StepRanker`] for a bounded candidate plan, filters
//! degenerate plans, and executes the surviving steps in order — falling
//! back to the configured default capability when no actionable plan
//! remains.

mod capability;
mod config;
mod dispatcher;
mod error;
mod plan;
mod planner;
mod registry;
mod shared;

pub use capability::{Capability, CapabilityDescriptor, NoOpCapability, SkillError, SkillSet};
pub use config::{DispatcherConfig, DEFAULT_GOAL_TEMPLATE, GOAL_PLACEHOLDER};
pub use dispatcher::Dispatcher;
pub use error::{DispatchError, PlanningError, RankError, RegistryError};
pub use plan::{Plan, PlanStep, StepRef};
pub use planner::{CandidateStep, PlanBuilder, StepRanker};
pub use registry::{CapabilityRegistry, ConditionalSkillSet, SkillSetFactory};
pub use shared::{DispatchContext, DispatchOutcome, DispatchRequest, RESULT_KEY};
