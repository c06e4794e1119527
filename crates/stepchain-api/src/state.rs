//! Application state wiring the orchestrator to the HTTP layer.
//!
//! The orchestrator is generic over the invoker; `AppState` pins it to the
//! concrete reqwest-backed client and gets constructed once at startup --
//! there is no ambient singleton.

use std::sync::Arc;

use stepchain_core::orchestrator::ChainOrchestrator;
use stepchain_infra::client::HttpWorkflowClient;

/// Orchestrator generic pinned to the HTTP workflow client.
pub type ConcreteOrchestrator = ChainOrchestrator<HttpWorkflowClient>;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ConcreteOrchestrator>,
}

impl AppState {
    /// Wire the orchestrator against the remote workflow service.
    pub fn init(api_base: &str, user: &str) -> Self {
        let client = HttpWorkflowClient::new(api_base, user);
        Self {
            orchestrator: Arc::new(ChainOrchestrator::new(client)),
        }
    }
}
