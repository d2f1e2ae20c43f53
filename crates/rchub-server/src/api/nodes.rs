//! Node endpoints

use crate::error::{HubError, HubResult};
use crate::nodes::{self, NodeHealth};
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct RemotesQuery {
    pub node: Option<String>,
}

/// Health and stats for every registered node
pub async fn list_nodes(State(state): State<AppState>) -> Json<Vec<NodeHealth>> {
    let timeout = state.streamer.config().stats_timeout;
    Json(nodes::node_health(&state.registry, state.gateway.as_ref(), timeout).await)
}

/// Remotes configured on one node
pub async fn list_remotes(
    State(state): State<AppState>,
    Query(query): Query<RemotesQuery>,
) -> HubResult<Json<Value>> {
    let node = query
        .node
        .filter(|n| !n.is_empty())
        .ok_or_else(|| HubError::InvalidRequest("Missing query parameter: node".to_string()))?;

    Ok(Json(
        nodes::list_remotes(&state.registry, state.gateway.as_ref(), &node).await?,
    ))
}
