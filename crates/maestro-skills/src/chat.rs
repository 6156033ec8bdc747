//! Chat responder skill: the default capability invoked when no actionable
//! plan exists. Mock mode composes a deterministic reply; live mode sends
//! the request to an OpenAI-compatible chat-completions endpoint.

use maestro_core::{Capability, DispatchContext, SkillError, SkillSet, RESULT_KEY};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const NAMESPACE: &str = "chat";
const ENV_LLM_MODE: &str = "MAESTRO_LLM_MODE";
const ENV_LLM_API_URL: &str = "MAESTRO_LLM_API_URL";
const ENV_LLM_API_KEY: &str = "MAESTRO_LLM_API_KEY";
const ENV_LLM_MODEL: &str = "MAESTRO_LLM_MODEL";
const DEFAULT_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const DEFAULT_MODEL: &str = "meta-llama/llama-3.3-70b-instruct";

/// Mode for LLM invocation: mock (simulated generation) or live (external
/// API call, key required).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LlmMode {
    #[default]
    Mock,
    Live,
}

impl LlmMode {
    pub fn from_env() -> Self {
        match std::env::var(ENV_LLM_MODE).as_deref() {
            Ok("live") => LlmMode::Live,
            _ => LlmMode::Mock,
        }
    }
}

// OpenAI-compatible request/response structures
#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
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

/// Skill set for the `chat` namespace.
pub struct ChatSkills {
    mode: LlmMode,
    client: reqwest::Client,
}

impl ChatSkills {
    pub fn new() -> Self {
        Self::with_mode(LlmMode::from_env())
    }

    pub fn with_mode(mode: LlmMode) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { mode, client }
    }
}

impl Default for ChatSkills {
    fn default() -> Self {
        Self::new()
    }
}

impl SkillSet for ChatSkills {
    fn namespace(&self) -> &str {
        NAMESPACE
    }

    fn capabilities(&self) -> Vec<Arc<dyn Capability>> {
        vec![Arc::new(Respond {
            mode: self.mode,
            client: self.client.clone(),
        })]
    }
}

/// `chat.respond` — answers the user input directly. This is the
/// designated fallback: it must always produce a useful primary result.
struct Respond {
    mode: LlmMode,
    client: reqwest::Client,
}

impl Respond {
    async fn complete_live(&self, prompt: &str) -> Result<String, SkillError> {
        let api_key = std::env::var(ENV_LLM_API_KEY)
            .map_err(|_| format!("{} not set for live LLM mode", ENV_LLM_API_KEY))?;
        let url =
            std::env::var(ENV_LLM_API_URL).unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let model = std::env::var(ENV_LLM_MODEL).unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let request = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: Some(0.7),
        };
        let response = self
            .client
            .post(&url)
            .bearer_auth(&api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;
        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or("completion response contained no choices")?;
        Ok(content)
    }
}

#[async_trait::async_trait]
impl Capability for Respond {
    fn namespace(&self) -> &str {
        NAMESPACE
    }

    fn name(&self) -> &str {
        "respond"
    }

    fn description(&self) -> &str {
        "Answer the user's request directly in natural language"
    }

    async fn invoke(&self, ctx: &mut DispatchContext) -> Result<(), SkillError> {
        let reply = match self.mode {
            LlmMode::Mock => mock_reply(ctx.input()),
            LlmMode::Live => self.complete_live(ctx.input()).await?,
        };
        ctx.set(RESULT_KEY, reply);
        Ok(())
    }
}

/// Deterministic reply used in mock deployments and tests.
fn mock_reply(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return "I need a request to work with. What would you like me to do?".to_string();
    }
    format!(
        "Here is what I can tell you about \"{}\": no connected integration handled it, \
so this is a direct answer from the assistant.",
        trimmed
    )
}
