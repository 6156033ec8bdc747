//! Calendar integration (`calendar` namespace), credential-gated.
//!
//! Fetches the day's agenda and creates events against a calendar REST
//! API. The OAuth token arrives with the dispatch request and is held only
//! for that request; it is never logged.

use chrono::{Duration, SecondsFormat, Utc};
use maestro_core::{Capability, DispatchContext, SkillError, SkillSet, RESULT_KEY};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const NAMESPACE: &str = "calendar";
const ENV_CALENDAR_API_URL: &str = "MAESTRO_CALENDAR_API_URL";
const DEFAULT_API_URL: &str = "https://calendar.example/api/v1";
const TITLE_KEY: &str = "title";
const START_TIME_KEY: &str = "start_time";
const AGENDA_KEY: &str = "agenda";
const EVENT_ID_KEY: &str = "event_id";

#[derive(Deserialize)]
struct EventRecord {
    id: String,
    subject: String,
    start: String,
}

#[derive(Deserialize)]
struct CalendarView {
    #[serde(default)]
    events: Vec<EventRecord>,
}

#[derive(Serialize)]
struct CreateEventRequest<'a> {
    subject: &'a str,
    start: &'a str,
    end: &'a str,
}

struct CalendarClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl CalendarClient {
    fn new(token: &str) -> Self {
        let base_url =
            std::env::var(ENV_CALENDAR_API_URL).unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(15))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url,
            token: token.to_string(),
        }
    }

    /// Calendar view for the next 24 hours.
    async fn today(&self) -> Result<Vec<EventRecord>, SkillError> {
        let start = Utc::now();
        let end = start + Duration::hours(24);
        let response = self
            .client
            .get(format!("{}/calendar/view", self.base_url))
            .bearer_auth(&self.token)
            .query(&[
                ("start", start.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ("end", end.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ])
            .send()
            .await?
            .error_for_status()?;
        let view: CalendarView = response.json().await?;
        Ok(view.events)
    }

    async fn create_event(&self, subject: &str, start: &str) -> Result<String, SkillError> {
        let start_at = chrono::DateTime::parse_from_rfc3339(start)
            .map_err(|e| format!("invalid start_time '{}': {}", start, e))?;
        let end_at = start_at + Duration::minutes(30);
        let response = self
            .client
            .post(format!("{}/calendar/events", self.base_url))
            .bearer_auth(&self.token)
            .json(&CreateEventRequest {
                subject,
                start: &start_at.to_rfc3339_opts(SecondsFormat::Secs, true),
                end: &end_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            })
            .send()
            .await?
            .error_for_status()?;
        let event: EventRecord = response.json().await?;
        Ok(event.id)
    }
}

/// Skill set for the `calendar` namespace, constructed per dispatch from
/// the request credential.
pub struct CalendarSkills {
    client: Arc<CalendarClient>,
}

impl CalendarSkills {
    pub fn new(token: &str) -> Self {
        Self {
            client: Arc::new(CalendarClient::new(token)),
        }
    }
}

impl SkillSet for CalendarSkills {
    fn namespace(&self) -> &str {
        NAMESPACE
    }

    fn capabilities(&self) -> Vec<Arc<dyn Capability>> {
        vec![
            Arc::new(Agenda {
                client: Arc::clone(&self.client),
            }),
            Arc::new(Schedule {
                client: Arc::clone(&self.client),
            }),
        ]
    }
}

/// `calendar.agenda` — summarizes the next 24 hours of events.
struct Agenda {
    client: Arc<CalendarClient>,
}

fn agenda_summary(events: &[EventRecord]) -> String {
    if events.is_empty() {
        return "No events in the next 24 hours.".to_string();
    }
    let listed: Vec<String> = events
        .iter()
        .take(5)
        .map(|e| format!("{} at {}", e.subject, e.start))
        .collect();
    format!(
        "{} event(s) in the next 24 hours: {}.",
        events.len(),
        listed.join("; ")
    )
}

#[async_trait::async_trait]
impl Capability for Agenda {
    fn namespace(&self) -> &str {
        NAMESPACE
    }

    fn name(&self) -> &str {
        "agenda"
    }

    fn description(&self) -> &str {
        "List the user's calendar events for the next 24 hours"
    }

    async fn invoke(&self, ctx: &mut DispatchContext) -> Result<(), SkillError> {
        let events = self.client.today().await?;
        let summary = agenda_summary(&events);
        ctx.set(AGENDA_KEY, summary.clone());
        ctx.set(RESULT_KEY, summary);
        Ok(())
    }
}

/// `calendar.schedule` — creates a 30-minute event from the `title` and
/// `start_time` (RFC 3339) variables.
struct Schedule {
    client: Arc<CalendarClient>,
}

#[async_trait::async_trait]
impl Capability for Schedule {
    fn namespace(&self) -> &str {
        NAMESPACE
    }

    fn name(&self) -> &str {
        "schedule"
    }

    fn description(&self) -> &str {
        "Create a calendar event at a given start time"
    }

    async fn invoke(&self, ctx: &mut DispatchContext) -> Result<(), SkillError> {
        let title = ctx
            .get(TITLE_KEY)
            .ok_or("calendar.schedule requires the title variable")?
            .to_string();
        let start = ctx
            .get(START_TIME_KEY)
            .ok_or("calendar.schedule requires the start_time variable (RFC 3339)")?
            .to_string();
        let event_id = self.client.create_event(&title, &start).await?;
        tracing::info!(event_id = %event_id, "calendar event created");
        ctx.set(EVENT_ID_KEY, event_id.clone());
        ctx.set(
            RESULT_KEY,
            format!("Scheduled \"{}\" at {} (event {}).", title, start, event_id),
        );
        Ok(())
    }
}
