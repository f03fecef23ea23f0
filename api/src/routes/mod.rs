use std::any::Any;

use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::error::AppError;
use crate::middleware;
use crate::state::AppState;

pub mod chat;
pub mod health;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Agent Relay Gateway",
        version = "0.1.0",
        description = "Forwards frontend chat turns to backend agents and normalizes their replies."
    ),
    paths(chat::chat, health::health_check),
    components(schemas(
        relay_core::chat::ChatRequest,
        relay_core::chat::ChatResponse,
        relay_core::error::ErrorBody,
        health::HealthResponse,
    ))
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

fn handle_panic(_err: Box<dyn Any + Send + 'static>) -> Response {
    AppError::Internal("request handler panicked".to_string()).into_response()
}

/// The full gateway: routes plus request id, tracing, CORS and panic layers.
pub fn app(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .merge(chat::router())
        .merge(health::router())
        .route("/api-doc/openapi.json", get(openapi_json))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::cors::build_cors_layer(cors_origins))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(axum::middleware::from_fn(
                    middleware::cors::preflight_no_content,
                )),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use relay_core::agents::{AgentEndpoint, AgentRegistry};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::backend::BackendClient;
    use crate::identity::IdentityTokens;

    fn app_under_test() -> Router {
        let http = reqwest::Client::new();
        let agents = AgentRegistry::new([
            (
                "travel".to_string(),
                AgentEndpoint::new("https://travel.run.app", Some("travel-agent")),
            ),
            ("unset".to_string(), AgentEndpoint::new("", None)),
        ]);
        let state = AppState::new(
            agents,
            BackendClient::new(http.clone(), Duration::from_secs(1)),
            IdentityTokens::new(http, None, Duration::from_secs(1)),
        );
        app(state, &["*".to_string()])
    }

    async fn get_json(uri: &str) -> (StatusCode, axum::http::HeaderMap, Value) {
        let response = app_under_test()
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("request should succeed");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body should collect")
            .to_bytes();
        (
            status,
            headers,
            serde_json::from_slice(&bytes).expect("body is json"),
        )
    }

    #[tokio::test]
    async fn health_reports_configured_agents() {
        let (status, headers, body) = get_json("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["agents"], 1);
        assert!(headers.contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn openapi_document_lists_chat_route() {
        let (status, _, body) = get_json("/api-doc/openapi.json").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/"]["post"].is_object());
        assert!(body["paths"]["/health"]["get"].is_object());
    }

    #[test]
    fn panics_render_generic_500() {
        let response = handle_panic(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
