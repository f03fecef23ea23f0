use std::net::SocketAddr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod backend;
mod config;
mod error;
mod extract;
mod identity;
mod middleware;
mod routes;
mod state;

use crate::backend::BackendClient;
use crate::config::GatewayConfig;
use crate::identity::IdentityTokens;

#[tokio::main]
async fn main() {
    // Load .env if present (dev only)
    let _ = dotenvy::dotenv();

    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relay_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let config = match GatewayConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "Invalid gateway configuration");
            std::process::exit(1);
        }
    };

    for agent_id in config.agents.configured_ids() {
        tracing::info!(agent_id, "Agent configured");
    }
    if config.agents.configured_ids().next().is_none() {
        tracing::warn!("No agent has a base URL; every chat request will be rejected");
    }
    if config.identity_url.is_none() {
        tracing::warn!("Identity tokens disabled; backend calls are unauthenticated");
    }

    let http = reqwest::Client::new();
    let app_state = state::AppState::new(
        config.agents,
        BackendClient::new(http.clone(), config.backend_timeout),
        IdentityTokens::new(http, config.identity_url, config.identity_timeout),
    );

    let app = routes::app(app_state, &config.cors_origins);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(%addr, error = %err, "Failed to bind listener");
            std::process::exit(1);
        }
    };
    tracing::info!("Agent relay listening on {}", addr);

    if let Err(err) = axum::serve(listener, app).await {
        tracing::error!(error = %err, "Server stopped");
        std::process::exit(1);
    }
}
