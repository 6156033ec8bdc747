//! LLM-backed step ranker: turns a goal plus the registry's capability
//! descriptors into an ordered candidate list via an OpenAI-compatible
//! completion endpoint. Mock mode proposes nothing, which drives the
//! dispatcher's fallback path in offline deployments.

use maestro_core::{CandidateStep, CapabilityDescriptor, RankError, StepRanker};
use serde::{Deserialize, Serialize};

use crate::chat::LlmMode;

const ENV_LLM_API_URL: &str = "MAESTRO_LLM_API_URL";
const ENV_LLM_API_KEY: &str = "MAESTRO_LLM_API_KEY";
const ENV_LLM_MODEL: &str = "MAESTRO_LLM_MODEL";
const DEFAULT_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const DEFAULT_MODEL: &str = "meta-llama/llama-3.3-70b-instruct";

/// Marker the model replies with when no capability applies.
const NO_PLAN_MARKER: &str = "DONE";

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: String,
}

/// Inference-backed [`StepRanker`].
pub struct LlmStepRanker {
    mode: LlmMode,
    client: reqwest::Client,
}

impl LlmStepRanker {
    pub fn new() -> Self {
        Self::with_mode(LlmMode::from_env())
    }

    pub fn with_mode(mode: LlmMode) -> Self {
        Self {
            mode,
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    async fn rank_live(
        &self,
        goal: &str,
        capabilities: &[CapabilityDescriptor],
    ) -> Result<Vec<CandidateStep>, RankError> {
        let api_key = std::env::var(ENV_LLM_API_KEY)
            .map_err(|_| RankError::new(format!("{} not set for live LLM mode", ENV_LLM_API_KEY)))?;
        let url = std::env::var(ENV_LLM_API_URL).unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let model = std::env::var(ENV_LLM_MODEL).unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let request = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: ranking_prompt(goal, capabilities),
            }],
            temperature: 0.0,
        };
        let response = self
            .client
            .post(&url)
            .bearer_auth(&api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RankError::new(format!("completion request failed: {}", e)))?
            .error_for_status()
            .map_err(|e| RankError::new(format!("completion request failed: {}", e)))?;
        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| RankError::new(format!("completion response unreadable: {}", e)))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| RankError::new("completion response contained no choices"))?;
        Ok(parse_candidates(&content))
    }
}

impl Default for LlmStepRanker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl StepRanker for LlmStepRanker {
    async fn rank(
        &self,
        goal: &str,
        capabilities: &[CapabilityDescriptor],
    ) -> Result<Vec<CandidateStep>, RankError> {
        match self.mode {
            LlmMode::Mock => Ok(Vec::new()),
            LlmMode::Live => self.rank_live(goal, capabilities).await,
        }
    }
}

fn ranking_prompt(goal: &str, capabilities: &[CapabilityDescriptor]) -> String {
    let mut lines = vec![
        "You sequence capability invocations for an assistant.".to_string(),
        format!("Goal: {}", goal),
        "Available capabilities:".to_string(),
    ];
    for descriptor in capabilities {
        lines.push(format!(
            "- {}: {}",
            descriptor.qualified_name(),
            descriptor.description
        ));
    }
    lines.push(
        "Reply with one step per line in execution order, formatted as \
`namespace.name` or `namespace.name | key=value; key2=value2` for pre-bound \
inputs. Use only listed capabilities. Reply with the single word DONE when \
none apply."
            .to_string(),
    );
    lines.join("\n")
}

/// Parses the model reply into candidate steps. Lines that do not match
/// the `namespace.name` shape are skipped rather than failing the plan.
fn parse_candidates(reply: &str) -> Vec<CandidateStep> {
    let mut candidates = Vec::new();
    for line in reply.lines() {
        let line = line.trim().trim_start_matches('-').trim();
        if line.is_empty() || line.eq_ignore_ascii_case(NO_PLAN_MARKER) {
            continue;
        }
        let (step_part, inputs_part) = match line.split_once('|') {
            Some((s, i)) => (s.trim(), Some(i.trim())),
            None => (line, None),
        };
        let Some((namespace, name)) = step_part.split_once('.') else {
            tracing::debug!(line, "skipping unparsable candidate line");
            continue;
        };
        let namespace = namespace.trim();
        let name = name.trim();
        if namespace.is_empty() || name.is_empty() {
            tracing::debug!(line, "skipping candidate with empty namespace or name");
            continue;
        }
        let mut candidate = CandidateStep::new(namespace, name);
        if let Some(inputs) = inputs_part {
            for pair in inputs.split(';') {
                if let Some((key, value)) = pair.split_once('=') {
                    candidate
                        .inputs
                        .insert(key.trim().to_string(), value.trim().to_string());
                }
            }
        }
        candidates.push(candidate);
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_steps() {
        let reply = "catalog.search\ncatalog.reserve\ntext.render";
        let candidates = parse_candidates(reply);
        let names: Vec<String> = candidates
            .iter()
            .map(|c| format!("{}.{}", c.namespace, c.name))
            .collect();
        assert_eq!(names, ["catalog.search", "catalog.reserve", "text.render"]);
    }

    #[test]
    fn parse_steps_with_inputs() {
        let candidates = parse_candidates("catalog.search | query=desk lamp; limit=3");
        assert_eq!(candidates.len(), 1);
        assert_eq!(
            candidates[0].inputs.get("query").map(String::as_str),
            Some("desk lamp")
        );
        assert_eq!(candidates[0].inputs.get("limit").map(String::as_str), Some("3"));
    }

    #[test]
    fn parse_skips_noise_and_done() {
        let reply = "Sure, here is the plan:\n- tickets.open\nDONE\n\nnot-a-step";
        let candidates = parse_candidates(reply);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name, "open");
    }

    #[test]
    fn mock_mode_proposes_nothing() {
        let ranker = LlmStepRanker::with_mode(LlmMode::Mock);
        let candidates = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(ranker.rank("goal", &[]))
            .unwrap();
        assert!(candidates.is_empty());
    }
}
