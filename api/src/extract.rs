//! Custom extractors that convert axum rejections to the gateway's error envelope.
//!
//! Use `AppJson<T>` instead of `axum::Json<T>` in handler signatures so a bad
//! body answers `400 {"error": ...}` rather than axum's plain-text rejection.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};
use relay_core::error::messages;

use crate::error::AppError;

pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => Err(map_json_rejection(rejection)),
        }
    }
}

/// Convert a `JsonRejection` to `AppError::Validation`.
///
/// Well-formed JSON of the wrong shape keeps serde's message; anything else
/// (bad syntax, wrong content type, unreadable body) is reported as invalid
/// JSON.
pub fn map_json_rejection(rejection: JsonRejection) -> AppError {
    match rejection {
        JsonRejection::JsonDataError(err) => {
            let body_text = err.body_text();
            AppError::Validation {
                message: format!("Invalid request body: {body_text}"),
                field: None,
            }
        }
        other => AppError::Validation {
            message: messages::INVALID_JSON_BODY.to_string(),
            field: Some(format!("body ({})", other.body_text())),
        },
    }
}
