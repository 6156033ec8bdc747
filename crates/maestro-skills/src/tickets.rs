//! Ticketing integration (`tickets` namespace), credential-gated.
//!
//! Registered only when the dispatch request carries a ticketing API
//! token. The token lives in the client for the duration of one dispatch
//! and is never logged.

use maestro_core::{Capability, DispatchContext, SkillError, SkillSet, RESULT_KEY};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const NAMESPACE: &str = "tickets";
const ENV_TICKETS_API_URL: &str = "MAESTRO_TICKETS_API_URL";
const DEFAULT_API_URL: &str = "https://api.ticketdesk.example/v1";
const SUMMARY_KEY: &str = "summary";
const TICKET_ID_KEY: &str = "ticket_id";

#[derive(Serialize)]
struct CreateTicketRequest<'a> {
    summary: &'a str,
    origin: &'a str,
}

#[derive(Deserialize)]
struct TicketRecord {
    id: String,
    status: String,
}

/// HTTP client wrapping the per-request credential.
struct TicketClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl TicketClient {
    fn new(token: &str) -> Self {
        let base_url =
            std::env::var(ENV_TICKETS_API_URL).unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(15))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url,
            token: token.to_string(),
        }
    }

    async fn create(&self, summary: &str) -> Result<TicketRecord, SkillError> {
        let idempotency_key = uuid::Uuid::new_v4().to_string();
        let response = self
            .client
            .post(format!("{}/tickets", self.base_url))
            .bearer_auth(&self.token)
            .header("Idempotency-Key", idempotency_key)
            .json(&CreateTicketRequest {
                summary,
                origin: "maestro",
            })
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn status(&self, ticket_id: &str) -> Result<TicketRecord, SkillError> {
        let response = self
            .client
            .get(format!("{}/tickets/{}", self.base_url, ticket_id))
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

/// Skill set for the `tickets` namespace. Constructed per dispatch from
/// the request credential.
pub struct TicketSkills {
    client: Arc<TicketClient>,
}

impl TicketSkills {
    pub fn new(token: &str) -> Self {
        Self {
            client: Arc::new(TicketClient::new(token)),
        }
    }
}

impl SkillSet for TicketSkills {
    fn namespace(&self) -> &str {
        NAMESPACE
    }

    fn capabilities(&self) -> Vec<Arc<dyn Capability>> {
        vec![
            Arc::new(OpenTicket {
                client: Arc::clone(&self.client),
            }),
            Arc::new(TicketStatus {
                client: Arc::clone(&self.client),
            }),
        ]
    }
}

/// `tickets.open` — files a new ticket from the `summary` variable (or the
/// raw input when unset) and records its id in the context.
struct OpenTicket {
    client: Arc<TicketClient>,
}

#[async_trait::async_trait]
impl Capability for OpenTicket {
    fn namespace(&self) -> &str {
        NAMESPACE
    }

    fn name(&self) -> &str {
        "open"
    }

    fn description(&self) -> &str {
        "Open a support ticket for the user's issue"
    }

    async fn invoke(&self, ctx: &mut DispatchContext) -> Result<(), SkillError> {
        let summary = ctx
            .get(SUMMARY_KEY)
            .unwrap_or_else(|| ctx.input())
            .to_string();
        let ticket = self.client.create(&summary).await?;
        tracing::info!(ticket_id = %ticket.id, "ticket opened");
        ctx.set(TICKET_ID_KEY, ticket.id.clone());
        ctx.set(
            RESULT_KEY,
            format!("Opened ticket {} (status: {}).", ticket.id, ticket.status),
        );
        Ok(())
    }
}

/// `tickets.status` — looks up the ticket referenced by `ticket_id`.
struct TicketStatus {
    client: Arc<TicketClient>,
}

#[async_trait::async_trait]
impl Capability for TicketStatus {
    fn namespace(&self) -> &str {
        NAMESPACE
    }

    fn name(&self) -> &str {
        "status"
    }

    fn description(&self) -> &str {
        "Look up the current status of an existing support ticket"
    }

    async fn invoke(&self, ctx: &mut DispatchContext) -> Result<(), SkillError> {
        let ticket_id = ctx
            .get(TICKET_ID_KEY)
            .ok_or("tickets.status requires the ticket_id variable")?
            .to_string();
        let ticket = self.client.status(&ticket_id).await?;
        ctx.set(
            RESULT_KEY,
            format!("Ticket {} is currently {}.", ticket.id, ticket.status),
        );
        Ok(())
    }
}
