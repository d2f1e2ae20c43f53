//! Test doubles shared by the unit tests

use async_trait::async_trait;
use rchub_connect::{GatewayError, Node, NodeRegistry, RcClient};
use rchub_store::SqliteStore;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// One recorded remote call
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub node: String,
    pub path: String,
    pub payload: Value,
}

/// `RcClient` that records every call and answers from canned rules
///
/// Nodes listed in `unreachable` fail with `GatewayError::Unreachable`.
/// Transfer operations answer `{"jobid": N}` with an increasing N.
#[derive(Default)]
pub struct RecordingClient {
    pub calls: Mutex<Vec<RecordedCall>>,
    pub unreachable: HashSet<String>,
    pub delay: Option<Duration>,
    pub remote_error: Option<(u16, String)>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unreachable(mut self, node: &str) -> Self {
        self.unreachable.insert(node.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_remote_error(mut self, status: u16, body: &str) -> Self {
        self.remote_error = Some((status, body.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.path == path)
            .collect()
    }
}

#[async_trait]
impl RcClient for RecordingClient {
    async fn call(
        &self,
        node: &Node,
        path: &str,
        payload: Option<Value>,
        _timeout: Option<Duration>,
    ) -> Result<Value, GatewayError> {
        let count = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(RecordedCall {
                node: node.id.clone(),
                path: path.to_string(),
                payload: payload.unwrap_or_else(|| json!({})),
            });
            calls.len()
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.unreachable.contains(&node.id) {
            return Err(GatewayError::Unreachable {
                node: node.id.clone(),
                detail: "connection refused".to_string(),
            });
        }

        if let Some((status, body)) = &self.remote_error {
            return Err(GatewayError::Remote {
                node: node.id.clone(),
                status: *status,
                body: body.clone(),
            });
        }

        Ok(match path {
            "core/stats" => json!({"bytes": 0, "transfers": 0, "node": node.id}),
            "config/listremotes" => json!({"remotes": ["gdrive", "s3"]}),
            "job/stop" => json!({}),
            _ => json!({"jobid": count}),
        })
    }
}

pub fn registry(ids: &[&str]) -> Arc<NodeRegistry> {
    let nodes = ids
        .iter()
        .enumerate()
        .map(|(i, id)| Node::new(*id, format!("10.0.0.{}", i + 1), 5572))
        .collect();
    Arc::new(NodeRegistry::new(nodes).unwrap())
}

pub async fn temp_store() -> (TempDir, Arc<SqliteStore>) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hub.db");
    let store = SqliteStore::open(path.to_str().unwrap()).await.unwrap();
    (dir, Arc::new(store))
}
