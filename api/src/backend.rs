use std::time::Duration;

use axum::http::StatusCode;
use relay_core::error::messages;
use serde::Serialize;
use serde_json::{Map, Value};

/// Why a call to an agent backend failed.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("{}", messages::BACKEND_TIMEOUT)]
    Timeout,
    #[error("Backend error ({status}): {detail}")]
    Status { status: u16, detail: String },
    #[error("{}", messages::BACKEND_INVALID_JSON)]
    InvalidJson,
    #[error("Agent backend unreachable: {0}")]
    Unreachable(String),
}

impl BackendError {
    /// Status the gateway answers with for this failure.
    pub fn status_code(&self) -> StatusCode {
        match self {
            BackendError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            BackendError::Status { status, .. } => StatusCode::from_u16(*status)
                .ok()
                .filter(|code| code.is_client_error() || code.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            BackendError::InvalidJson | BackendError::Unreachable(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

/// JSON-over-HTTP client for agent backends. One attempt per call, no retries.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    timeout: Duration,
}

impl BackendClient {
    pub fn new(http: reqwest::Client, timeout: Duration) -> Self {
        Self { http, timeout }
    }

    /// POST `body` as JSON to `url`, with a bearer token when one is available.
    ///
    /// A successful empty reply reads as `{}`.
    pub async fn post_json<B>(
        &self,
        url: &str,
        body: &B,
        token: Option<&str>,
    ) -> Result<Value, BackendError>
    where
        B: Serialize + ?Sized,
    {
        let mut request = self.http.post(url).timeout(self.timeout).json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        tracing::info!(url, authenticated = token.is_some(), "Calling agent backend");
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;
        tracing::info!(url, status = status.as_u16(), "Agent backend responded");

        if !status.is_success() {
            let detail = error_detail(&text);
            tracing::warn!(
                url,
                status = status.as_u16(),
                detail = %truncate(&detail, 1000),
                "Agent backend returned an error"
            );
            return Err(BackendError::Status {
                status: status.as_u16(),
                detail,
            });
        }

        if status == StatusCode::NO_CONTENT || text.trim().is_empty() {
            tracing::debug!(url, "Agent backend returned an empty body");
            return Ok(Value::Object(Map::new()));
        }

        serde_json::from_str(&text).map_err(|err| {
            tracing::warn!(
                url,
                status = status.as_u16(),
                error = %err,
                body = %truncate(&text, 500),
                "Agent backend did not return valid JSON"
            );
            BackendError::InvalidJson
        })
    }
}

fn transport_error(err: reqwest::Error) -> BackendError {
    if err.is_timeout() {
        tracing::error!(url = ?err.url().map(|url| url.as_str()), "Agent backend timed out");
        BackendError::Timeout
    } else {
        tracing::error!(error = %err, "Network error calling agent backend");
        BackendError::Unreachable(err.to_string())
    }
}

/// Human-readable detail from a failed backend reply: the `detail` field (first
/// entry when it is a list) if the body is JSON carrying one, else the raw body.
pub fn error_detail(body: &str) -> String {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("detail").cloned());

    match detail {
        Some(Value::Array(items)) => items.first().map(render).unwrap_or_default(),
        Some(detail) => render(&detail),
        None => body.to_string(),
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}
