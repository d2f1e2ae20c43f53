/*!
 * Wiring: config -> store, registry, gateway -> application state
 */

use crate::config::HubConfig;
use crate::error::Result;
use rchub_connect::{HttpGateway, NodeRegistry};
use rchub_server::AppState;
use rchub_store::SqliteStore;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

/// Open the job store and build the state shared by all handlers
pub async fn build_state(config: &HubConfig) -> Result<AppState> {
    let store = SqliteStore::open(&config.database).await?;
    info!("Job store: {}", config.database);

    let registry = Arc::new(NodeRegistry::new(config.nodes.clone())?);
    let gateway = HttpGateway::with_timeout(config.rc_timeout())?;

    let state = AppState::new(
        registry,
        Arc::new(gateway),
        Arc::new(store),
        config.stream_config(),
    )
    .with_api_key(config.api_key.clone());

    if state.api_key.is_none() {
        info!("No API key configured, /v1 is open");
    }

    Ok(state)
}

/// Re-read the config file and swap in its node list
///
/// Only the nodes are applied; the API key and listener stay as they were at
/// startup. Returns the new node count.
pub async fn reload_nodes(registry: &NodeRegistry, config_path: &Path) -> Result<usize> {
    let config = HubConfig::load(config_path)?;
    let count = config.nodes.len();
    registry.reload(config.nodes).await?;
    Ok(count)
}

/// Reload the node registry whenever the process receives SIGHUP
#[cfg(unix)]
pub fn spawn_reload_on_sighup(
    registry: Arc<NodeRegistry>,
    config_path: std::path::PathBuf,
) -> std::io::Result<tokio::task::JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangups = signal(SignalKind::hangup())?;

    Ok(tokio::spawn(async move {
        while hangups.recv().await.is_some() {
            info!("SIGHUP received, reloading {}", config_path.display());
            if let Err(e) = reload_nodes(&registry, &config_path).await {
                error!("Config reload failed, keeping previous nodes: {}", e);
            }
        }
    }))
}
