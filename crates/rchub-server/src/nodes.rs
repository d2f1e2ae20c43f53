//! Per-node health and remote listing

use crate::error::HubResult;
use futures::future::join_all;
use rchub_connect::{paths, NodeRegistry, RcClient};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Health of one registered node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeHealth {
    pub id: String,
    /// Display name from the node config, `null` when unset
    pub name: Option<String>,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<Value>,
}

/// Ask every registered node for `core/stats`
///
/// A failing node is reported as `ok: false` and does not affect the others.
pub async fn node_health(
    registry: &NodeRegistry,
    gateway: &dyn RcClient,
    timeout: Duration,
) -> Vec<NodeHealth> {
    let snapshot = registry.snapshot().await;

    let checks = snapshot.iter().map(|node| async move {
        let name = node.name.clone();
        match gateway
            .call(node, paths::CORE_STATS, None, Some(timeout))
            .await
        {
            Ok(stats) => NodeHealth {
                id: node.id.clone(),
                name,
                ok: true,
                stats: Some(stats),
            },
            Err(e) => {
                debug!("Health check failed for {}: {}", node.id, e);
                NodeHealth {
                    id: node.id.clone(),
                    name,
                    ok: false,
                    stats: None,
                }
            }
        }
    });

    join_all(checks).await
}

/// The agent's `config/listremotes` reply, passed through unchanged
pub async fn list_remotes(
    registry: &NodeRegistry,
    gateway: &dyn RcClient,
    node_id: &str,
) -> HubResult<Value> {
    let node = registry.lookup(node_id).await?;
    Ok(gateway.call(&node, paths::LIST_REMOTES, None, None).await?)
}
