use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use relay_core::agents::UnknownAgent;
use relay_core::chat::{ChatResponse, MissingFields};
use relay_core::error::{ErrorBody, messages};

use crate::backend::BackendError;

/// Internal error type that converts to the frontend error envelope.
///
/// When the gateway already knows the session, the body carries the full
/// `{response, error, session_id}` shape so the frontend can keep the session.
#[derive(Debug)]
pub enum AppError {
    /// Missing or invalid inbound fields (400)
    Validation {
        message: String,
        field: Option<String>,
    },
    /// Agent id not in the registry or without a URL (404)
    UnknownAgent(UnknownAgent),
    /// Any method other than POST/OPTIONS on the chat route (405)
    MethodNotAllowed,
    /// Backend call failed (504 on timeout, backend status or 502 otherwise)
    Backend {
        source: BackendError,
        session_id: Option<String>,
    },
    /// Session creation answered without a usable id (502)
    SessionCreation(String),
    /// Backend reply was not an object (502)
    MalformedReply { session_id: Option<String> },
    /// Backend replied but the reply carried no text or an error (502)
    AgentReply(ChatResponse),
    /// Internal error (500)
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::UnknownAgent(_) => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Backend { source, .. } => source.status_code(),
            AppError::SessionCreation(_)
            | AppError::MalformedReply { .. }
            | AppError::AgentReply(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (message, session_id) = match self {
            AppError::Validation { message, field } => {
                tracing::warn!(field = field.as_deref(), "Rejected chat request: {}", message);
                (message, None)
            }
            AppError::UnknownAgent(err) => {
                tracing::error!("{}", err);
                (err.to_string(), None)
            }
            AppError::MethodNotAllowed => (messages::METHOD_NOT_ALLOWED.to_string(), None),
            AppError::Backend { source, session_id } => {
                tracing::error!(
                    status = status.as_u16(),
                    session_id = session_id.as_deref(),
                    "Agent backend call failed: {}",
                    source
                );
                (source.to_string(), session_id)
            }
            AppError::SessionCreation(message) => {
                tracing::error!("{}", message);
                (message, None)
            }
            AppError::MalformedReply { session_id } => {
                tracing::error!(
                    session_id = session_id.as_deref(),
                    "Agent backend reply was not a JSON object"
                );
                (messages::MALFORMED_REPLY.to_string(), session_id)
            }
            AppError::AgentReply(reply) => {
                tracing::error!(
                    session_id = reply.session_id.as_deref(),
                    error = reply.error.as_deref(),
                    "Agent reply carried no usable text"
                );
                return (status, Json(ChatResponse { response: None, ..reply })).into_response();
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (messages::INTERNAL_ERROR.to_string(), None)
            }
        };

        match session_id {
            Some(session_id) => (
                status,
                Json(ChatResponse {
                    response: None,
                    error: Some(message),
                    session_id: Some(session_id),
                }),
            )
                .into_response(),
            None => (status, Json(ErrorBody::new(message))).into_response(),
        }
    }
}

impl From<UnknownAgent> for AppError {
    fn from(err: UnknownAgent) -> Self {
        AppError::UnknownAgent(err)
    }
}

impl From<MissingFields> for AppError {
    fn from(err: MissingFields) -> Self {
        AppError::Validation {
            message: err.to_string(),
            field: Some(err.0.join(",")),
        }
    }
}

impl From<BackendError> for AppError {
    fn from(source: BackendError) -> Self {
        AppError::Backend {
            source,
            session_id: None,
        }
    }
}
