//! Shared state handed to every handler

use crate::orchestrator::JobOrchestrator;
use crate::stream::StatsStreamer;
use crate::StreamConfig;
use rchub_connect::{NodeRegistry, RcClient};
use rchub_store::JobStore;
use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Reloadable node registry
    pub registry: Arc<NodeRegistry>,

    pub gateway: Arc<dyn RcClient>,

    pub store: Arc<dyn JobStore>,

    pub orchestrator: Arc<JobOrchestrator>,

    pub streamer: StatsStreamer,

    /// Fixed at startup; `None` disables the API key check
    pub api_key: Option<Arc<str>>,
}

impl AppState {
    pub fn new(
        registry: Arc<NodeRegistry>,
        gateway: Arc<dyn RcClient>,
        store: Arc<dyn JobStore>,
        stream: StreamConfig,
    ) -> Self {
        let orchestrator = Arc::new(JobOrchestrator::new(
            registry.clone(),
            gateway.clone(),
            store.clone(),
        ));
        let streamer = StatsStreamer::new(registry.clone(), gateway.clone(), stream);

        Self {
            registry,
            gateway,
            store,
            orchestrator,
            streamer,
            api_key: None,
        }
    }

    /// Require `X-API-Key` on `/v1`; an empty key leaves the API open
    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key.filter(|k| !k.is_empty()).map(Arc::from);
        self
    }
}
