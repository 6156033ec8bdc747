//! Dispatcher configuration: goal template, plan bounds, and designated
//! capabilities. Loaded from `config/gateway.toml` and `MAESTRO`-prefixed
//! environment variables; defaults cover a bare deployment.

use crate::plan::StepRef;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Placeholder replaced with the request goal when rendering
/// [`DispatcherConfig::goal_template`].
pub const GOAL_PLACEHOLDER: &str = "{input}";

/// Default goal template handed to the plan builder.
pub const DEFAULT_GOAL_TEMPLATE: &str = "Satisfy the following request, or explain why it cannot \
be satisfied, then pick a renderer to format the answer: {input}";

fn default_goal_template() -> String {
    DEFAULT_GOAL_TEMPLATE.to_string()
}

fn default_max_plan_steps() -> usize {
    6
}

fn default_fallback() -> StepRef {
    StepRef::new("chat", "respond")
}

fn default_final_renderer() -> StepRef {
    StepRef::new("text", "render")
}

/// Static dispatcher configuration, read-only after startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Goal template handed to the plan builder; must contain `{input}`.
    #[serde(default = "default_goal_template")]
    pub goal_template: String,
    /// Upper bound on planned steps (bounds inference cost and prevents
    /// runaway plans).
    #[serde(default = "default_max_plan_steps")]
    pub max_plan_steps: usize,
    /// Capability invoked directly when the filtered plan is empty.
    #[serde(default = "default_fallback")]
    pub fallback: StepRef,
    /// The trivial terminal renderer dropped when it is the sole
    /// remaining step.
    #[serde(default = "default_final_renderer")]
    pub final_renderer: StepRef,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            goal_template: default_goal_template(),
            max_plan_steps: default_max_plan_steps(),
            fallback: default_fallback(),
            final_renderer: default_final_renderer(),
        }
    }
}

impl DispatcherConfig {
    /// Renders the goal template for a request input.
    pub fn goal_for(&self, input: &str) -> String {
        self.goal_template.replace(GOAL_PLACEHOLDER, input)
    }

    /// Checks static invariants. Violations are fatal at startup, not
    /// per-request.
    pub fn validate(&self) -> Result<(), String> {
        if !self.goal_template.contains(GOAL_PLACEHOLDER) {
            return Err(format!(
                "goal_template must contain the {} placeholder",
                GOAL_PLACEHOLDER
            ));
        }
        if self.max_plan_steps == 0 {
            return Err("max_plan_steps must be at least 1".to_string());
        }
        Ok(())
    }

    /// Load precedence: env `MAESTRO_CONFIG` path > `config/gateway.toml`
    /// > defaults, then `MAESTRO`-prefixed environment overrides
    /// (`MAESTRO__MAX_PLAN_STEPS`, `MAESTRO__FALLBACK__NAMESPACE`, ...).
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("MAESTRO_CONFIG").unwrap_or_else(|_| "config/gateway".to_string());
        let builder = config::Config::builder();

        let path = Path::new(&config_path);
        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder
        };

        let built = builder
            .add_source(config::Environment::with_prefix("MAESTRO").separator("__"))
            .build()?;

        built.try_deserialize()
    }
}
