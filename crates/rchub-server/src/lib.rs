//! rchub Server - Control Plane
//!
//! Job orchestration, live node stats and the HTTP API in front of a fleet of
//! rclone agents. Built with Axum; job records live in `rchub-store`, agent
//! calls go through `rchub-connect`.

pub mod api;
pub mod auth;
pub mod error;
pub mod locks;
pub mod nodes;
pub mod orchestrator;
pub mod server;
pub mod state;
pub mod stream;

pub use error::{HubError, HubResult};
pub use nodes::NodeHealth;
pub use orchestrator::{JobOrchestrator, JobRequest, StopOutcome};
pub use server::build_router;
pub use state::AppState;
pub use stream::{StatsEvent, StatsOutcome, StatsStreamer};

use std::time::Duration;

/// Pacing of the live stats stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    /// Delay between polling rounds
    pub interval: Duration,
    /// Per-node timeout for a `core/stats` call
    pub stats_timeout: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            stats_timeout: Duration::from_secs(10),
        }
    }
}

/// Configuration for the Control Plane server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Start the Control Plane API server
pub async fn start_server(config: ServerConfig, state: AppState) -> std::io::Result<()> {
    server::run_server(&config, state).await
}

#[cfg(test)]
pub(crate) mod testing;
