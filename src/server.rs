//! HTTP endpoints exposing the content actions.
//!
//! Buffered actions answer with JSON. Streaming actions answer with server-sent events:
//! every unnamed event carries one JSON-encoded chunk (a string for text actions, a
//! snapshot object for suggestions). An `error` event reports a failure mid-stream and a
//! `done` event always closes the stream.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::actions::Reviver;
use crate::config::{ReviverConfig, ServerConfig};
use crate::error::{self, ActionError, LlmError};
use crate::llm::create_provider;
use crate::model::{
    Action, ExplainOptions, RewriteOptions, SuggestionsOptions, SummarizeOptions,
};
use crate::relay::hold;
use crate::tracker::{LoadingGuard, TEXTAREA_REWRITE, TEXTAREA_SUGGEST, vivify_label};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub reviver: Arc<Reviver>,
    pub config: Arc<ReviverConfig>,
}

/// Build the Axum router with the action routes.
pub fn action_routes(reviver: Arc<Reviver>, config: ReviverConfig) -> Router {
    let state = AppState {
        reviver,
        config: Arc::new(config),
    };

    Router::new()
        .route("/health", get(health))
        .route("/api/config", get(get_config))
        .route("/api/loading", get(get_loading))
        .route("/api/summarize", post(summarize))
        .route("/api/key-points", post(key_points))
        .route("/api/alternatives", post(alternatives))
        .route("/api/explain", post(explain))
        .route("/api/rewrite", post(rewrite))
        .route("/api/complete", post(complete))
        .route("/api/suggestions", post(suggestions))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Build the provider and action configuration from `config`, then serve until shutdown.
pub async fn serve(config: ServerConfig) -> error::Result<()> {
    let actions = config.reviver_config().await?;
    let llm = create_provider(&config.llm)?;
    let app = action_routes(Arc::new(Reviver::new(llm)), actions.clone());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!(
        port = config.port,
        actions = ?actions.vivify.actions,
        text_area = ?actions.text_area.enhancement_actions,
        "Reviver server started"
    );
    axum::serve(listener, app).await?;
    Ok(())
}

// ── Request bodies ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ContentRequest<O> {
    pub content: String,
    #[serde(default)]
    pub options: Option<O>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPointsRequest {
    pub content: String,
    #[serde(default)]
    pub max_points: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct AlternativesRequest {
    pub content: String,
    #[serde(default)]
    pub count: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionRequestBody {
    pub content: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

// ── Meta ────────────────────────────────────────────────────────────────

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "model": state.reviver.model_name(),
    }))
}

async fn get_config(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.config.as_ref().clone())
}

async fn get_loading(State(state): State<AppState>) -> impl IntoResponse {
    let tracker = state.reviver.tracker();
    Json(serde_json::json!({
        "active": tracker.is_active(),
        "actions": tracker.loading(),
    }))
}

// ── Buffered actions ────────────────────────────────────────────────────

async fn summarize(
    State(state): State<AppState>,
    Json(body): Json<ContentRequest<SummarizeOptions>>,
) -> Response {
    if let Err(e) = ensure_enabled(&state, Action::Summarize) {
        return error_response(e);
    }
    let _loading = state.reviver.tracker().begin(vivify_label(Action::Summarize));
    let response = state
        .reviver
        .summarize_content(&body.content, body.options)
        .await;
    Json(response).into_response()
}

async fn key_points(
    State(state): State<AppState>,
    Json(body): Json<KeyPointsRequest>,
) -> Response {
    if let Err(e) = ensure_enabled(&state, Action::KeyPoints) {
        return error_response(e);
    }
    let _loading = state.reviver.tracker().begin(vivify_label(Action::KeyPoints));
    let response = state
        .reviver
        .extract_key_points(&body.content, body.max_points)
        .await;
    Json(response).into_response()
}

async fn alternatives(
    State(state): State<AppState>,
    Json(body): Json<AlternativesRequest>,
) -> Response {
    let _loading = state.reviver.tracker().begin("alternatives");
    match state
        .reviver
        .generate_alternatives(&body.content, body.count)
        .await
    {
        Ok(alternatives) => Json(alternatives).into_response(),
        Err(e) => error_response(e),
    }
}

// ── Streaming actions ───────────────────────────────────────────────────

async fn explain(
    State(state): State<AppState>,
    Json(body): Json<ContentRequest<ExplainOptions>>,
) -> Response {
    if let Err(e) = ensure_enabled(&state, Action::Explain) {
        return error_response(e);
    }
    let loading = state.reviver.tracker().begin(vivify_label(Action::Explain));
    match state
        .reviver
        .explain_content(&body.content, body.options)
        .await
    {
        Ok(stream) => sse_response(stream, loading),
        Err(e) => error_response(e),
    }
}

async fn rewrite(
    State(state): State<AppState>,
    Json(body): Json<ContentRequest<RewriteOptions>>,
) -> Response {
    if let Err(e) = ensure_enabled(&state, Action::Rewrite) {
        return error_response(e);
    }
    let loading = state.reviver.tracker().begin(TEXTAREA_REWRITE);
    match state
        .reviver
        .rewrite_content(&body.content, body.options)
        .await
    {
        Ok(stream) => sse_response(stream, loading),
        Err(e) => error_response(e),
    }
}

async fn complete(
    State(state): State<AppState>,
    Json(body): Json<CompletionRequestBody>,
) -> Response {
    if !state.config.text_area.auto_complete {
        return error_response(ActionError::Disabled {
            action: "completion".to_string(),
        });
    }
    let loading = state.reviver.tracker().begin("completion");
    match state.reviver.get_completion(&body.content).await {
        Ok(stream) => sse_response(stream, loading),
        Err(e) => error_response(e),
    }
}

async fn suggestions(
    State(state): State<AppState>,
    Json(body): Json<ContentRequest<SuggestionsOptions>>,
) -> Response {
    if let Err(e) = ensure_enabled(&state, Action::Suggestions) {
        return error_response(e);
    }
    let loading = state.reviver.tracker().begin(TEXTAREA_SUGGEST);
    match state
        .reviver
        .get_suggestions(&body.content, body.options)
        .await
    {
        Ok(stream) => sse_response(stream, loading),
        Err(e) => error_response(e),
    }
}

// ── Helpers ─────────────────────────────────────────────────────────────

fn ensure_enabled(state: &AppState, action: Action) -> Result<(), ActionError> {
    if state.config.is_enabled(action) {
        Ok(())
    } else {
        Err(ActionError::Disabled {
            action: action.to_string(),
        })
    }
}

/// Relay a result stream as SSE, keeping the action marked as loading until it ends.
fn sse_response<T>(stream: BoxStream<'static, Result<T, LlmError>>, loading: LoadingGuard) -> Response
where
    T: Serialize + Send + 'static,
{
    let label = loading.label().to_string();
    let events = hold(stream, loading).map(move |item| match item {
        Ok(chunk) => Event::default()
            .json_data(chunk)
            .unwrap_or_else(|e| error_event(&e.to_string())),
        Err(e) => {
            warn!(action = %label, error = %e, "Stream failed");
            error_event(&e.to_string())
        }
    });
    let done = stream::once(async { Event::default().event("done").data("") });
    let events = events.chain(done).map(Ok::<_, Infallible>);

    Sse::new(events)
        .keep_alive(KeepAlive::default())
        .into_response()
}

fn error_event(message: &str) -> Event {
    Event::default()
        .event("error")
        .json_data(ErrorBody {
            error: message.to_string(),
        })
        .unwrap_or_else(|_| Event::default().event("error"))
}

fn error_response(err: ActionError) -> Response {
    let status = match &err {
        ActionError::EmptyContent(_) => StatusCode::BAD_REQUEST,
        ActionError::Disabled { .. } => StatusCode::NOT_FOUND,
        ActionError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ActionError::Unparseable { .. } | ActionError::Llm(_) | ActionError::Aborted(_) => {
            StatusCode::BAD_GATEWAY
        }
    };
    info!(status = %status, error = %err, "Action rejected");
    (
        status,
        Json(ErrorBody {
            error: err.to_string(),
        }),
    )
        .into_response()
}
