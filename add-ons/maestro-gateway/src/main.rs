//! Axum-based API gateway: HTTP entry point for the maestro dispatcher.
//!
//! Per-integration credentials arrive as request headers and gate skill
//! registration for that single dispatch; the gateway holds no credential
//! beyond the request that carried it. LLM API keys stay in the backend
//! environment and are never accepted from or returned to clients.

use axum::{
    extract::{Json, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use maestro_core::{
    ConditionalSkillSet, DispatchError, DispatchRequest, Dispatcher, DispatcherConfig, SkillSet,
};
use maestro_skills::{
    CalendarSkills, CatalogSkills, ChatSkills, LlmStepRanker, TextSkills, TicketSkills,
    INTEGRATION_CALENDAR, INTEGRATION_CATALOG, INTEGRATION_TICKETS,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

const HEADER_TICKETS_KEY: &str = "x-maestro-tickets-key";
const HEADER_CALENDAR_TOKEN: &str = "x-maestro-calendar-token";
const HEADER_CATALOG_KEY: &str = "x-maestro-catalog-key";

const DEFAULT_PORT: u16 = 8001;

#[derive(Clone)]
struct AppState {
    dispatcher: Arc<Dispatcher>,
}

#[derive(Debug, Deserialize)]
struct DispatchBody {
    goal: String,
    #[serde(default)]
    variables: Vec<(String, String)>,
}

fn build_dispatcher(config: DispatcherConfig) -> Result<Dispatcher, DispatchError> {
    let static_sets: Vec<Arc<dyn SkillSet>> =
        vec![Arc::new(ChatSkills::new()), Arc::new(TextSkills)];
    let conditional_sets = vec![
        ConditionalSkillSet::new(INTEGRATION_TICKETS, |credential| {
            Arc::new(TicketSkills::new(credential)) as Arc<dyn SkillSet>
        }),
        ConditionalSkillSet::new(INTEGRATION_CALENDAR, |credential| {
            Arc::new(CalendarSkills::new(credential)) as Arc<dyn SkillSet>
        }),
        ConditionalSkillSet::new(INTEGRATION_CATALOG, |credential| {
            Arc::new(CatalogSkills::new(credential)) as Arc<dyn SkillSet>
        }),
    ];
    Dispatcher::new(
        config,
        Arc::new(LlmStepRanker::new()),
        static_sets,
        conditional_sets,
    )
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/capabilities", get(capabilities))
        .route("/v1/dispatch", post(dispatch))
        .layer(tower_http::cors::CorsLayer::permissive())
        .with_state(state)
}

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!(
            "[maestro-gateway] .env not loaded: {} (using system environment)",
            e
        );
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .init();

    let config = match DispatcherConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "failed to load dispatcher configuration");
            std::process::exit(1);
        }
    };
    let port: u16 = std::env::var("MAESTRO_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    let dispatcher = match build_dispatcher(config) {
        Ok(dispatcher) => Arc::new(dispatcher),
        Err(e) => {
            tracing::error!(error = %e, "invalid dispatcher configuration");
            std::process::exit(1);
        }
    };

    let app = router(AppState { dispatcher });
    let addr = format!("0.0.0.0:{}", port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %addr, "failed to bind gateway port");
            std::process::exit(1);
        }
    };
    tracing::info!(%addr, "maestro gateway listening");
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server error");
    }
}

async fn health() -> &'static str {
    "ok"
}

/// GET /v1/capabilities — descriptors of the unconditionally registered
/// capabilities (credential-gated ones are only visible per request).
async fn capabilities(State(state): State<AppState>) -> Response {
    Json(json!({ "capabilities": state.dispatcher.static_descriptors() })).into_response()
}

/// POST /v1/dispatch — runs one dispatch. Integration credentials are read
/// from headers; absent headers simply leave those skill sets unregistered.
async fn dispatch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<DispatchBody>,
) -> Response {
    let correlation_id = uuid::Uuid::new_v4().to_string();
    let mut request = DispatchRequest::new(body.goal);
    request.variables = body.variables;
    request.correlation_id = Some(correlation_id.clone());

    for (integration, header) in [
        (INTEGRATION_TICKETS, HEADER_TICKETS_KEY),
        (INTEGRATION_CALENDAR, HEADER_CALENDAR_TOKEN),
        (INTEGRATION_CATALOG, HEADER_CATALOG_KEY),
    ] {
        if let Some(value) = headers.get(header).and_then(|v| v.to_str().ok()) {
            if !value.trim().is_empty() {
                request
                    .credentials
                    .insert(integration.to_string(), value.to_string());
            }
        }
    }

    match state.dispatcher.dispatch(request).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(json!({
                "ok": true,
                "output": outcome.output,
                "variables": outcome.variables,
            })),
        )
            .into_response(),
        Err(err) => {
            tracing::warn!(%correlation_id, kind = err.kind(), error = %err, "dispatch failed");
            (
                status_for(&err),
                Json(json!({
                    "ok": false,
                    "kind": err.kind(),
                    "message": err.to_string(),
                })),
            )
                .into_response()
        }
    }
}

fn status_for(err: &DispatchError) -> StatusCode {
    match err {
        DispatchError::Planning(_) => StatusCode::BAD_REQUEST,
        DispatchError::NotFound { .. } => StatusCode::NOT_FOUND,
        DispatchError::Capability { .. } => StatusCode::BAD_GATEWAY,
        DispatchError::Registry(_) | DispatchError::Configuration(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
