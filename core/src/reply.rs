//! Reply normalization: turns whatever JSON an agent backend sends back into
//! the frontend contract (`response`, `error`, `session_id`).
//!
//! Backends are unversioned and have emitted several reply shapes over time.
//! The recognised ones are listed in [`ReplyShape`] in priority order; treat
//! the list as a compatibility shim rather than a protocol.

use serde_json::{Map, Value};

use crate::chat::ChatResponse;
use crate::error::messages;

/// The payload was not a JSON object (or an array wrapping one).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", messages::MALFORMED_REPLY)]
pub struct MalformedPayload;

/// Result of normalizing one backend payload.
///
/// `response_text` and `error_message` are never both set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedReply {
    response_text: Option<String>,
    session_id: Option<String>,
    error_message: Option<String>,
}

impl NormalizedReply {
    pub fn response_text(&self) -> Option<&str> {
        self.response_text.as_deref()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    fn fail(&mut self, message: String) {
        self.error_message = Some(message);
        self.response_text = None;
    }

    pub fn into_response(self) -> ChatResponse {
        ChatResponse {
            response: self.response_text,
            error: self.error_message,
            session_id: self.session_id,
        }
    }
}

/// Places a backend may put its reply text, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReplyShape<'a> {
    /// `events[]`: the newest `OUTPUT` event carrying text
    Events(&'a [Value]),
    /// `content.parts[0].text`
    ContentParts(&'a [Value]),
    /// `output.response`, else `output.text`. An `output` object without
    /// either still lets the top-level `response` answer.
    Output(&'a Map<String, Value>),
    /// top-level `response`
    Response(&'a Value),
}

impl<'a> ReplyShape<'a> {
    /// Every shape present in `payload`, in extraction priority order.
    pub fn detect(payload: &'a Map<String, Value>) -> Vec<ReplyShape<'a>> {
        let mut shapes = Vec::with_capacity(4);
        if let Some(Value::Array(events)) = payload.get("events") {
            shapes.push(ReplyShape::Events(events));
        }
        if let Some(Value::Array(parts)) = payload
            .get("content")
            .and_then(Value::as_object)
            .and_then(|content| content.get("parts"))
        {
            shapes.push(ReplyShape::ContentParts(parts));
        }
        if let Some(Value::Object(output)) = payload.get("output") {
            shapes.push(ReplyShape::Output(output));
        }
        if let Some(response) = payload.get("response") {
            shapes.push(ReplyShape::Response(response));
        }
        shapes
    }

    /// Reply text carried by this shape. JSON `null` is no text.
    pub fn text(&self) -> Option<&'a Value> {
        let text = match *self {
            ReplyShape::Events(events) => return events.iter().rev().find_map(output_event_text),
            ReplyShape::ContentParts(parts) => parts
                .first()
                .and_then(Value::as_object)
                .and_then(|part| part.get("text")),
            ReplyShape::Output(output) => keyed_text(output),
            ReplyShape::Response(response) => Some(response),
        };
        text.filter(|value| !value.is_null())
    }
}

fn output_event_text(event: &Value) -> Option<&Value> {
    let event = event.as_object()?;
    if event.get("type").and_then(Value::as_str) != Some("OUTPUT") {
        return None;
    }
    let data = event.get("data")?;
    let text = match data {
        Value::Object(fields) => keyed_text(fields),
        Value::String(_) => Some(data),
        _ => None,
    };
    text.filter(|value| !value.is_null())
}

/// `response` when the key exists, otherwise `text`.
fn keyed_text(object: &Map<String, Value>) -> Option<&Value> {
    object.get("response").or_else(|| object.get("text"))
}

/// Normalize a backend payload.
///
/// `session_override` is the session the gateway already knows about (from the
/// caller or from a session it just created); it wins over ids in the payload.
pub fn normalize(
    payload: &Value,
    session_override: Option<&str>,
) -> Result<NormalizedReply, MalformedPayload> {
    let payload = payload.as_object().ok_or(MalformedPayload)?;

    let mut reply = NormalizedReply {
        session_id: session_override
            .map(str::to_string)
            .or_else(|| match payload.get("session_id") {
                Some(session_id) => payload_session_id(session_id),
                None => payload.get("id").and_then(scalar_string),
            }),
        ..NormalizedReply::default()
    };

    let text = ReplyShape::detect(payload)
        .iter()
        .find_map(ReplyShape::text)
        .map(render);

    match text {
        Some(text) => reply.response_text = Some(text),
        None => {
            let session_ack = session_override.is_some()
                && is_blank(payload.get("events"))
                && is_blank(payload.get("content"));
            if !session_ack {
                reply.fail(messages::REPLY_TEXT_NOT_FOUND.to_string());
            }
        }
    }

    if let Some(error) = payload.get("error").filter(|error| !error.is_null()) {
        let detail = error
            .as_object()
            .and_then(|error| error.get("message"))
            .unwrap_or(error);
        reply.fail(format!("Agent error: {}", render(detail)));
    }

    Ok(reply)
}

/// Pick the payload to normalize from a `/run` reply. Some backends answer
/// with a list; the first element is the one the gateway reads.
pub fn select_run_payload(value: Value) -> Result<Value, MalformedPayload> {
    match value {
        Value::Array(items) => match items.into_iter().next() {
            Some(first @ Value::Object(_)) => Ok(first),
            _ => Err(MalformedPayload),
        },
        other => Ok(other),
    }
}

/// Session id as found in a backend payload: strings and numbers only.
pub fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A `session_id` field is taken as sent once present, even when empty.
fn payload_session_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        other => scalar_string(other),
    }
}

/// Strings verbatim, everything else as compact JSON.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => true,
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(fields)) => fields.is_empty(),
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Bool(true)) | Some(Value::Number(_)) => false,
    }
}
