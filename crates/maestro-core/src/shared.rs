//! Shared types threaded through one dispatch: the mutable key/value
//! context, the incoming request, and the outcome returned to the caller.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Conventional key every capability sets with its primary result.
/// The dispatcher reads this key to populate [`DispatchOutcome::output`].
pub const RESULT_KEY: &str = "result";

/// Mutable key/value state threaded through one dispatch.
///
/// Created from the incoming goal and seed variables, mutated in place by
/// each executed capability, and discarded when the dispatch ends. Keys can
/// be added or overwritten but never removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchContext {
    input: String,
    variables: HashMap<String, String>,
}

impl DispatchContext {
    /// Builds a context from the primary input and an ordered seed
    /// sequence. Duplicate keys in the seed: last write wins.
    pub fn new(
        input: impl Into<String>,
        seed: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        let mut variables = HashMap::new();
        for (key, value) in seed {
            variables.insert(key, value);
        }
        Self {
            input: input.into(),
            variables,
        }
    }

    /// The primary input string the dispatch started with.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Inserts or overwrites a variable.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(key.into(), value.into());
    }

    /// Returns the variable under `key`, if set.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.variables.get(key).map(String::as_str)
    }

    /// Read-only view of all variables.
    pub fn variables(&self) -> &HashMap<String, String> {
        &self.variables
    }

    /// Copy of the current variables, used for failure diagnostics.
    pub(crate) fn snapshot(&self) -> HashMap<String, String> {
        self.variables.clone()
    }
}

/// Incoming dispatch request: the user goal, seed variables, and the
/// per-integration credentials that unlock optional skill sets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchRequest {
    /// Free-text user goal.
    pub goal: String,
    /// Ordered seed for the context variables (last write wins).
    #[serde(default)]
    pub variables: Vec<(String, String)>,
    /// Integration name → opaque credential. Integrations without a
    /// credential are simply not registered for this dispatch.
    #[serde(default)]
    pub credentials: HashMap<String, String>,
    /// Optional correlation id for request tracing.
    #[serde(default)]
    pub correlation_id: Option<String>,
}

impl DispatchRequest {
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            ..Self::default()
        }
    }

    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.push((key.into(), value.into()));
        self
    }

    pub fn with_credential(mut self, integration: impl Into<String>, credential: impl Into<String>) -> Self {
        self.credentials.insert(integration.into(), credential.into());
        self
    }
}

/// Successful outcome of a dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchOutcome {
    /// Primary result value (the context's [`RESULT_KEY`] at completion).
    pub output: String,
    /// All named variables of the final context.
    pub variables: HashMap<String, String>,
}
