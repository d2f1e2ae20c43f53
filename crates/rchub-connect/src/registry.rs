//! NodeRegistry: the set of agents the hub is allowed to talk to

use crate::error::ConnectError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// A configured rclone agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier for this node
    pub id: String,

    /// Display name (optional)
    #[serde(default)]
    pub name: Option<String>,

    /// Host or IP of the agent's remote-control listener
    #[serde(alias = "ip")]
    pub address: String,

    /// Port of the agent's remote-control listener
    pub port: u16,
}

impl Node {
    /// Create a node without a display name
    pub fn new(id: impl Into<String>, address: impl Into<String>, port: u16) -> Self {
        Self {
            id: id.into(),
            name: None,
            address: address.into(),
            port,
        }
    }

    /// Create a node with a display name
    pub fn with_name(
        id: impl Into<String>,
        name: impl Into<String>,
        address: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new(id, address, port)
        }
    }
}

/// An immutable view of the registry
///
/// Nodes keep configuration order. When two descriptors share an id the later
/// one wins, but it takes the slot of the first occurrence.
#[derive(Debug, Default)]
pub struct RegistrySnapshot {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
}

impl RegistrySnapshot {
    /// Build a snapshot from node descriptors
    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Result<Self, ConnectError> {
        let mut snapshot = Self::default();

        for node in nodes {
            if node.id.trim().is_empty() {
                return Err(ConnectError::InvalidNode(format!(
                    "node at {}:{} has an empty id",
                    node.address, node.port
                )));
            }

            match snapshot.index.get(&node.id) {
                Some(&slot) => {
                    warn!("Duplicate node id {}; later entry overrides", node.id);
                    snapshot.nodes[slot] = node;
                }
                None => {
                    snapshot.index.insert(node.id.clone(), snapshot.nodes.len());
                    snapshot.nodes.push(node);
                }
            }
        }

        Ok(snapshot)
    }

    pub fn get(&self, node_id: &str) -> Option<&Node> {
        self.index.get(node_id).map(|&slot| &self.nodes[slot])
    }

    /// Nodes in configuration order
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Registry of known agents
///
/// Readers grab an `Arc` to the current snapshot; `reload` builds a complete
/// new snapshot before swapping it in, so nobody ever sees a half-applied
/// reload. Individual nodes are never mutated.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    current: RwLock<Arc<RegistrySnapshot>>,
}

impl NodeRegistry {
    /// Create a registry from node descriptors
    pub fn new(nodes: Vec<Node>) -> Result<Self, ConnectError> {
        let snapshot = RegistrySnapshot::from_nodes(nodes)?;
        info!("Node registry loaded with {} node(s)", snapshot.len());
        Ok(Self {
            current: RwLock::new(Arc::new(snapshot)),
        })
    }

    /// Current snapshot
    pub async fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.current.read().await.clone()
    }

    /// Resolve a node id
    pub async fn lookup(&self, node_id: &str) -> Result<Node, ConnectError> {
        self.snapshot()
            .await
            .get(node_id)
            .cloned()
            .ok_or_else(|| ConnectError::NodeNotFound(node_id.to_string()))
    }

    /// All nodes as `(id, node)` pairs in configuration order
    pub async fn all(&self) -> Vec<(String, Node)> {
        self.snapshot()
            .await
            .iter()
            .map(|node| (node.id.clone(), node.clone()))
            .collect()
    }

    /// Replace the whole registry
    ///
    /// On error the previous snapshot stays in place.
    pub async fn reload(&self, nodes: Vec<Node>) -> Result<(), ConnectError> {
        let snapshot = Arc::new(RegistrySnapshot::from_nodes(nodes)?);
        let count = snapshot.len();

        *self.current.write().await = snapshot;

        info!("Node registry reloaded with {} node(s)", count);
        debug!("Registry swap complete");
        Ok(())
    }
}
