use std::collections::BTreeMap;
use std::time::Duration;

use relay_core::agents::{AgentEndpoint, AgentRegistry};
use url::Url;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 45;
const DEFAULT_IDENTITY_TIMEOUT_SECS: u64 = 3;
const DEFAULT_METADATA_URL: &str = "http://metadata.google.internal";
const IDENTITY_PATH: &str = "computeMetadata/v1/instance/service-accounts/default/identity";

/// Agent served when `RELAY_AGENTS` is not set.
const BUILTIN_AGENT_ID: &str = "foncorp-travel-agent";
const BUILTIN_AGENT_APP: &str = "travel-agent";
const BUILTIN_AGENT_URL_VAR: &str = "TRAVEL_AGENT_URL";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("PORT must be a valid port number, got '{0}'")]
    InvalidPort(String),
    #[error("{var} must be a whole number of seconds, got '{value}'")]
    InvalidSeconds { var: &'static str, value: String },
    #[error("RELAY_AGENTS must be a JSON object of agents: {0}")]
    InvalidAgents(#[source] serde_json::Error),
    #[error("RELAY_METADATA_URL is not a valid URL: {0}")]
    InvalidMetadataUrl(#[source] url::ParseError),
}

/// Everything the gateway reads from its environment, resolved once at startup.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub port: u16,
    pub agents: AgentRegistry,
    /// Allowed CORS origins; `*` (the default) allows any origin
    pub cors_origins: Vec<String>,
    pub backend_timeout: Duration,
    pub identity_timeout: Duration,
    /// Metadata identity endpoint, `None` when token minting is disabled
    pub identity_url: Option<Url>,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let port = match var("PORT") {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidPort(value))?,
            None => DEFAULT_PORT,
        };

        let agents = match var("RELAY_AGENTS") {
            Some(raw) => parse_agents(&raw)?,
            None => AgentRegistry::new([(
                BUILTIN_AGENT_ID.to_string(),
                AgentEndpoint::new(
                    var(BUILTIN_AGENT_URL_VAR).unwrap_or_default(),
                    Some(BUILTIN_AGENT_APP),
                ),
            )]),
        };

        let cors_origins = var("RELAY_CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        let backend_timeout = seconds(
            "RELAY_BACKEND_TIMEOUT_SECS",
            var("RELAY_BACKEND_TIMEOUT_SECS"),
            DEFAULT_BACKEND_TIMEOUT_SECS,
        )?;
        let identity_timeout = seconds(
            "RELAY_IDENTITY_TIMEOUT_SECS",
            var("RELAY_IDENTITY_TIMEOUT_SECS"),
            DEFAULT_IDENTITY_TIMEOUT_SECS,
        )?;

        let tokens_enabled = var("RELAY_IDENTITY_TOKENS")
            .map(|value| !matches!(value.to_lowercase().as_str(), "false" | "0" | "off" | "no"))
            .unwrap_or(true);
        let identity_url = if tokens_enabled {
            let base = var("RELAY_METADATA_URL").unwrap_or_else(|| DEFAULT_METADATA_URL.to_string());
            Some(identity_endpoint(&base)?)
        } else {
            None
        };

        Ok(Self {
            port,
            agents,
            cors_origins,
            backend_timeout,
            identity_timeout,
            identity_url,
        })
    }
}

fn parse_agents(raw: &str) -> Result<AgentRegistry, ConfigError> {
    let agents: BTreeMap<String, AgentEndpoint> =
        serde_json::from_str(raw).map_err(ConfigError::InvalidAgents)?;
    Ok(AgentRegistry::new(agents))
}

fn seconds(var: &'static str, value: Option<String>, default: u64) -> Result<Duration, ConfigError> {
    match value {
        Some(value) => value
            .parse()
            .map(Duration::from_secs)
            .map_err(|_| ConfigError::InvalidSeconds { var, value }),
        None => Ok(Duration::from_secs(default)),
    }
}

fn identity_endpoint(base: &str) -> Result<Url, ConfigError> {
    let mut base = Url::parse(base).map_err(ConfigError::InvalidMetadataUrl)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(IDENTITY_PATH).map_err(ConfigError::InvalidMetadataUrl)
}
