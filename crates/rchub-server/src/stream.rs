//! Live stats fan-out
//!
//! Every subscriber gets its own polling task. A round takes one registry
//! snapshot, asks each node for `core/stats` concurrently, and emits one event
//! per node in registry order. The task exits as soon as the subscriber's
//! receiver is dropped.

use crate::StreamConfig;
use futures::future::join_all;
use rchub_connect::{paths, Node, NodeRegistry, RcClient};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, trace};

/// Outcome of one node's stats call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatsOutcome {
    Stats { stats: Value },
    Error { error: bool },
}

/// One line of the live stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsEvent {
    /// Unix epoch seconds
    pub t: i64,
    pub node: String,
    #[serde(flatten)]
    pub outcome: StatsOutcome,
}

impl StatsEvent {
    pub fn ok(t: i64, node: impl Into<String>, stats: Value) -> Self {
        Self {
            t,
            node: node.into(),
            outcome: StatsOutcome::Stats { stats },
        }
    }

    pub fn failed(t: i64, node: impl Into<String>) -> Self {
        Self {
            t,
            node: node.into(),
            outcome: StatsOutcome::Error { error: true },
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, StatsOutcome::Error { .. })
    }

    /// Serialize as a single newline-terminated JSON line
    pub fn to_ndjson_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// Polls every registered node and fans results out to subscribers
#[derive(Clone)]
pub struct StatsStreamer {
    registry: Arc<NodeRegistry>,
    gateway: Arc<dyn RcClient>,
    config: StreamConfig,
}

impl StatsStreamer {
    pub fn new(
        registry: Arc<NodeRegistry>,
        gateway: Arc<dyn RcClient>,
        config: StreamConfig,
    ) -> Self {
        Self {
            registry,
            gateway,
            config,
        }
    }

    pub fn config(&self) -> StreamConfig {
        self.config
    }

    async fn poll_node(&self, node: &Node) -> StatsEvent {
        let result = self
            .gateway
            .call(node, paths::CORE_STATS, None, Some(self.config.stats_timeout))
            .await;
        let t = chrono::Utc::now().timestamp();

        match result {
            Ok(stats) => StatsEvent::ok(t, node.id.clone(), stats),
            Err(e) => {
                debug!("Stats poll failed for {}: {}", node.id, e);
                StatsEvent::failed(t, node.id.clone())
            }
        }
    }

    /// One polling round over a single registry snapshot
    pub async fn poll_round(&self) -> Vec<StatsEvent> {
        let snapshot = self.registry.snapshot().await;
        join_all(snapshot.iter().map(|node| self.poll_node(node))).await
    }

    /// Start a subscriber task and return its event stream
    ///
    /// The stream never ends on its own; drop it to stop polling.
    pub fn subscribe(&self) -> ReceiverStream<StatsEvent> {
        let (tx, rx) = mpsc::channel(64);
        let streamer = self.clone();

        tokio::spawn(async move {
            debug!("Stats subscriber started");
            loop {
                let round = tokio::select! {
                    _ = tx.closed() => break,
                    events = streamer.poll_round() => events,
                };

                for event in round {
                    if tx.send(event).await.is_err() {
                        debug!("Stats subscriber went away");
                        return;
                    }
                }

                trace!("Stats round complete");

                tokio::select! {
                    _ = tx.closed() => break,
                    _ = tokio::time::sleep(streamer.config.interval) => {}
                }
            }
            debug!("Stats subscriber went away");
        });

        ReceiverStream::new(rx)
    }
}
