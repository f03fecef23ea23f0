use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use relay_core::agents::AgentTarget;
use relay_core::chat::{ChatRequest, ChatResponse, ChatTurn, DirectRequest, RunRequest};
use relay_core::reply::{NormalizedReply, normalize, scalar_string, select_run_payload};
use serde_json::{Value, json};

use crate::error::AppError;
use crate::extract::AppJson;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(chat).fallback(method_not_allowed))
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

/// Relay one chat turn to the agent named by `agentId`
///
/// Session-aware agents get a session created on the first turn; the reply is
/// reduced to a single text whatever shape the backend answered with.
#[utoipa::path(
    post,
    path = "/",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Agent reply", body = ChatResponse),
        (status = 400, description = "Missing or invalid fields", body = relay_core::error::ErrorBody),
        (status = 404, description = "Unknown agent", body = relay_core::error::ErrorBody),
        (status = 502, description = "Agent backend failed or replied without text", body = ChatResponse),
        (status = 504, description = "Agent backend timed out", body = relay_core::error::ErrorBody)
    ),
    tag = "chat"
)]
pub async fn chat(
    State(state): State<AppState>,
    AppJson(request): AppJson<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let turn = request.validate()?;
    tracing::info!(
        agent_id = %turn.agent_id,
        session_id = turn.session_id.as_deref(),
        "Received chat turn"
    );

    let target = state.agents.resolve(&turn.agent_id)?;
    let token = state.identity.fetch(target.base_url()).await;

    let reply = match target {
        AgentTarget::Session { app_name, .. } => {
            session_turn(&state, target, app_name, &turn, token.as_deref()).await?
        }
        AgentTarget::Direct { base_url } => {
            direct_turn(&state, base_url, &turn, token.as_deref()).await?
        }
    };

    tracing::info!(
        agent_id = %turn.agent_id,
        session_id = reply.session_id(),
        has_response = reply.response_text().is_some(),
        has_error = reply.error_message().is_some(),
        "Normalized agent reply"
    );

    if reply.error_message().is_some() {
        return Err(AppError::AgentReply(reply.into_response()));
    }
    Ok(Json(reply.into_response()))
}

/// `/run` against a session-aware backend, creating the session first when
/// the frontend did not send one.
async fn session_turn(
    state: &AppState,
    target: AgentTarget<'_>,
    app_name: &str,
    turn: &ChatTurn,
    token: Option<&str>,
) -> Result<NormalizedReply, AppError> {
    let session_id = match &turn.session_id {
        Some(session_id) => session_id.clone(),
        None => create_session(state, target, token).await?,
    };

    let run = RunRequest::user_turn(app_name, &session_id, &turn.message);
    let payload = state
        .backend
        .post_json(&target.run_url(), &run, token)
        .await
        .map_err(|source| AppError::Backend {
            source,
            session_id: Some(session_id.clone()),
        })?;

    normalize_reply(payload, Some(&session_id))
}

async fn create_session(
    state: &AppState,
    target: AgentTarget<'_>,
    token: Option<&str>,
) -> Result<String, AppError> {
    let url = target
        .sessions_url()
        .ok_or_else(|| AppError::Internal("session requested for a direct agent".to_string()))?;

    let created = state.backend.post_json(&url, &json!({}), token).await?;
    let created = created.as_object().ok_or_else(|| {
        AppError::SessionCreation(
            "Failed to create session: Invalid response from agent backend.".to_string(),
        )
    })?;
    let session_id = created
        .get("id")
        .and_then(scalar_string)
        .ok_or_else(|| {
            AppError::SessionCreation("Failed to create session: No ID returned.".to_string())
        })?;

    tracing::info!(session_id = %session_id, "Created agent session");
    Ok(session_id)
}

/// Single POST carrying the message and history to an agent without sessions.
async fn direct_turn(
    state: &AppState,
    base_url: &str,
    turn: &ChatTurn,
    token: Option<&str>,
) -> Result<NormalizedReply, AppError> {
    let body = DirectRequest {
        message: &turn.message,
        history: &turn.history,
        session_id: turn.session_id.as_deref(),
    };
    let payload = state
        .backend
        .post_json(base_url, &body, token)
        .await
        .map_err(|source| AppError::Backend {
            source,
            session_id: turn.session_id.clone(),
        })?;

    normalize_reply(payload, turn.session_id.as_deref())
}

fn normalize_reply(payload: Value, session_id: Option<&str>) -> Result<NormalizedReply, AppError> {
    tracing::debug!(session_id, payload = %payload, "Raw agent reply");
    let malformed = || AppError::MalformedReply {
        session_id: session_id.map(str::to_string),
    };
    let payload = select_run_payload(payload).map_err(|_| malformed())?;
    normalize(&payload, session_id).map_err(|_| malformed())
}
