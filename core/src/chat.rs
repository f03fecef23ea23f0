use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// User id the gateway presents to session-aware backends.
pub const GATEWAY_USER_ID: &str = "gateway_user";

/// Chat turn as sent by the frontend.
///
/// Every field is optional at the wire level so that missing fields can be
/// reported together instead of failing on the first one serde encounters.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ChatRequest {
    /// The user's message (required, non-empty)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Identifier of the backend agent to talk to (required)
    #[serde(default, rename = "agentId", skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    /// Existing backend session; omitted on the first turn
    #[serde(default, rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Prior turns, forwarded verbatim to direct-mode agents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<Value>>,
}

/// A chat request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatTurn {
    pub message: String,
    pub agent_id: String,
    pub session_id: Option<String>,
    pub history: Vec<Value>,
}

/// Required inbound fields that were absent or empty.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Missing required fields: {}", .0.join(", "))]
pub struct MissingFields(pub Vec<&'static str>);

impl ChatRequest {
    /// Check required fields. Empty strings count as missing.
    pub fn validate(self) -> Result<ChatTurn, MissingFields> {
        let message = non_empty(self.message);
        let agent_id = non_empty(self.agent_id);

        match (message, agent_id) {
            (Some(message), Some(agent_id)) => Ok(ChatTurn {
                message,
                agent_id,
                session_id: non_empty(self.session_id),
                history: self.history.unwrap_or_default(),
            }),
            (message, agent_id) => {
                let mut missing = Vec::new();
                if message.is_none() {
                    missing.push("message");
                }
                if agent_id.is_none() {
                    missing.push("agentId");
                }
                Err(MissingFields(missing))
            }
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Response contract consumed by the frontend.
///
/// All three keys are always present; `response` and `error` are never both set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChatResponse {
    /// Agent reply text
    pub response: Option<String>,
    /// Error description when the agent could not produce a reply
    pub error: Option<String>,
    /// Backend session to reuse on the next turn
    pub session_id: Option<String>,
}

/// Body of the `/run` call on a session-aware backend.
#[derive(Debug, Clone, Serialize)]
pub struct RunRequest<'a> {
    pub app_name: &'a str,
    pub user_id: &'a str,
    pub session_id: &'a str,
    pub new_message: NewMessage<'a>,
    pub streaming: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewMessage<'a> {
    pub role: &'a str,
    pub parts: Vec<TextPart<'a>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextPart<'a> {
    pub text: &'a str,
}

impl<'a> RunRequest<'a> {
    pub fn user_turn(app_name: &'a str, session_id: &'a str, message: &'a str) -> Self {
        Self {
            app_name,
            user_id: GATEWAY_USER_ID,
            session_id,
            new_message: NewMessage {
                role: "user",
                parts: vec![TextPart { text: message }],
            },
            streaming: false,
        }
    }
}

/// Body forwarded to agents that take the chat turn in a single call.
#[derive(Debug, Clone, Serialize)]
pub struct DirectRequest<'a> {
    pub message: &'a str,
    pub history: &'a [Value],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<&'a str>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(value: Value) -> ChatRequest {
        serde_json::from_value(value).expect("chat request should deserialize")
    }

    #[test]
    fn validate_accepts_complete_request() {
        let turn = request(json!({
            "message": "hello",
            "agentId": "travel",
            "sessionId": "s-1",
            "history": [{"role": "user", "text": "earlier"}]
        }))
        .validate()
        .expect("request should validate");

        assert_eq!(turn.message, "hello");
        assert_eq!(turn.agent_id, "travel");
        assert_eq!(turn.session_id.as_deref(), Some("s-1"));
        assert_eq!(turn.history.len(), 1);
    }

    #[test]
    fn validate_lists_every_missing_field() {
        let err = request(json!({})).validate().expect_err("empty body must fail");
        assert_eq!(err.0, vec!["message", "agentId"]);
        assert_eq!(err.to_string(), "Missing required fields: message, agentId");
    }

    #[test]
    fn validate_treats_empty_strings_as_missing() {
        let err = request(json!({"message": "", "agentId": "travel"}))
            .validate()
            .expect_err("empty message must fail");
        assert_eq!(err.to_string(), "Missing required fields: message");
    }

    #[test]
    fn validate_drops_empty_session_id() {
        let turn = request(json!({"message": "hi", "agentId": "travel", "sessionId": ""}))
            .validate()
            .expect("request should validate");
        assert_eq!(turn.session_id, None);
        assert!(turn.history.is_empty());
    }

    #[test]
    fn chat_response_always_serializes_three_keys() {
        let body = serde_json::to_value(ChatResponse::default()).expect("serialize");
        assert_eq!(
            body,
            json!({"response": null, "error": null, "session_id": null})
        );
    }

    #[test]
    fn run_request_matches_backend_shape() {
        let body = serde_json::to_value(RunRequest::user_turn("travel-agent", "s-9", "hi"))
            .expect("serialize");
        assert_eq!(
            body,
            json!({
                "app_name": "travel-agent",
                "user_id": "gateway_user",
                "session_id": "s-9",
                "new_message": {"role": "user", "parts": [{"text": "hi"}]},
                "streaming": false
            })
        );
    }

    #[test]
    fn direct_request_omits_unknown_session() {
        let history = vec![json!({"role": "user", "text": "before"})];
        let body = serde_json::to_value(DirectRequest {
            message: "hi",
            history: &history,
            session_id: None,
        })
        .expect("serialize");
        assert_eq!(
            body,
            json!({"message": "hi", "history": [{"role": "user", "text": "before"}]})
        );
    }
}
