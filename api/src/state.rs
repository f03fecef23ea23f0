use std::sync::Arc;

use relay_core::agents::AgentRegistry;

use crate::backend::BackendClient;
use crate::identity::IdentityTokens;

#[derive(Clone)]
pub struct AppState {
    pub agents: Arc<AgentRegistry>,
    pub backend: BackendClient,
    pub identity: IdentityTokens,
}

impl AppState {
    pub fn new(agents: AgentRegistry, backend: BackendClient, identity: IdentityTokens) -> Self {
        Self {
            agents: Arc::new(agents),
            backend,
            identity,
        }
    }
}
