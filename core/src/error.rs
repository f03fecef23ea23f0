use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error envelope returned by the gateway when no session is known yet.
///
/// The frontend only ever reads the `error` string, so nothing else is carried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Human-readable description of what went wrong
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Fixed messages shared by the gateway and its clients
pub mod messages {
    pub const INVALID_JSON_BODY: &str = "Request body must be valid JSON";
    pub const METHOD_NOT_ALLOWED: &str = "Method Not Allowed";
    pub const INTERNAL_ERROR: &str = "Internal server error in gateway";
    pub const BACKEND_TIMEOUT: &str = "Backend agent timed out";
    pub const BACKEND_INVALID_JSON: &str = "Agent backend did not return valid JSON";
    pub const REPLY_TEXT_NOT_FOUND: &str =
        "Agent response text not found in expected output structure.";
    pub const MALFORMED_REPLY: &str = "Agent backend returned an unexpected response structure";
}
