use std::collections::BTreeMap;

use serde::Deserialize;

use crate::chat::GATEWAY_USER_ID;

/// Where an agent lives and, for session-aware backends, which app it serves.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AgentEndpoint {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub app_name: Option<String>,
}

impl AgentEndpoint {
    pub fn new(url: impl Into<String>, app_name: Option<&str>) -> Self {
        Self {
            url: url.into(),
            app_name: app_name.map(str::to_string),
        }
    }
}

/// Immutable `agentId -> endpoint` table, built once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentRegistry {
    agents: BTreeMap<String, AgentEndpoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("AgentId '{0}' not recognized or misconfigured.")]
pub struct UnknownAgent(pub String);

/// A resolved agent. Agents with an app name get the two-step session flow,
/// the rest receive the chat turn in a single call to their base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentTarget<'a> {
    Session { base_url: &'a str, app_name: &'a str },
    Direct { base_url: &'a str },
}

impl AgentRegistry {
    pub fn new(agents: impl IntoIterator<Item = (String, AgentEndpoint)>) -> Self {
        Self {
            agents: agents.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Agent ids that resolve to a usable endpoint.
    pub fn configured_ids(&self) -> impl Iterator<Item = &str> {
        self.agents
            .iter()
            .filter(|(_, endpoint)| !endpoint.url.trim().is_empty())
            .map(|(id, _)| id.as_str())
    }

    pub fn resolve(&self, agent_id: &str) -> Result<AgentTarget<'_>, UnknownAgent> {
        let endpoint = self
            .agents
            .get(agent_id)
            .ok_or_else(|| UnknownAgent(agent_id.to_string()))?;

        let base_url = endpoint.url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(UnknownAgent(agent_id.to_string()));
        }

        match endpoint.app_name.as_deref().map(str::trim) {
            Some(app_name) if !app_name.is_empty() => {
                Ok(AgentTarget::Session { base_url, app_name })
            }
            _ => Ok(AgentTarget::Direct { base_url }),
        }
    }
}

impl<'a> AgentTarget<'a> {
    /// Base URL without a trailing slash; also the identity token audience.
    pub fn base_url(&self) -> &'a str {
        match *self {
            AgentTarget::Session { base_url, .. } | AgentTarget::Direct { base_url } => base_url,
        }
    }

    pub fn run_url(&self) -> String {
        format!("{}/run", self.base_url())
    }

    /// Session creation endpoint; `None` for direct agents.
    pub fn sessions_url(&self) -> Option<String> {
        match self {
            AgentTarget::Session { base_url, app_name } => Some(format!(
                "{base_url}/apps/{app_name}/users/{GATEWAY_USER_ID}/sessions"
            )),
            AgentTarget::Direct { .. } => None,
        }
    }
}
