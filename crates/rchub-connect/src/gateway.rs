//! Remote-control gateway: invoke a named operation on an agent

use crate::error::GatewayError;
use crate::registry::Node;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Path namespace of the agent's remote-control API
pub const RC_PATH_PREFIX: &str = "rc";

/// Timeout applied when the caller does not pass one
pub const DEFAULT_RC_TIMEOUT: Duration = Duration::from_secs(300);

/// Remote-control operations the hub invokes
pub mod paths {
    pub const COPY: &str = "operations/copyfs";
    pub const MOVE: &str = "operations/movefs";
    pub const SYNC: &str = "sync/sync";
    pub const JOB_STOP: &str = "job/stop";
    pub const CORE_STATS: &str = "core/stats";
    pub const LIST_REMOTES: &str = "config/listremotes";
}

/// Invoker of remote-control operations
///
/// `payload` defaults to an empty JSON object; `timeout` defaults to the
/// implementation's default. Implementations never retry.
#[async_trait]
pub trait RcClient: Send + Sync {
    async fn call(
        &self,
        node: &Node,
        path: &str,
        payload: Option<Value>,
        timeout: Option<Duration>,
    ) -> Result<Value, GatewayError>;
}

/// `RcClient` that speaks JSON over HTTP
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    default_timeout: Duration,
}

impl HttpGateway {
    /// Create a gateway with the 300 second default timeout
    pub fn new() -> Result<Self, GatewayError> {
        Self::with_timeout(DEFAULT_RC_TIMEOUT)
    }

    /// Create a gateway with a custom default timeout
    pub fn with_timeout(default_timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(GatewayError::Build)?;

        Ok(Self {
            client,
            default_timeout,
        })
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// URL of an operation on a node
    pub fn endpoint(node: &Node, path: &str) -> String {
        format!(
            "http://{}:{}/{}/{}",
            node.address,
            node.port,
            RC_PATH_PREFIX,
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl RcClient for HttpGateway {
    async fn call(
        &self,
        node: &Node,
        path: &str,
        payload: Option<Value>,
        timeout: Option<Duration>,
    ) -> Result<Value, GatewayError> {
        let url = Self::endpoint(node, path);
        let payload = payload.unwrap_or_else(|| Value::Object(Default::default()));

        debug!("rc call {} on {}", path, node.id);

        let response = self
            .client
            .post(&url)
            .timeout(timeout.unwrap_or(self.default_timeout))
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                warn!("rc call {} on {} failed: {}", path, node.id, e);
                GatewayError::Unreachable {
                    node: node.id.clone(),
                    detail: e.to_string(),
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Unreachable {
                node: node.id.clone(),
                detail: e.to_string(),
            })?;

        if !status.is_success() {
            warn!("rc call {} on {} returned {}", path, node.id, status);
            return Err(GatewayError::Remote {
                node: node.id.clone(),
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| GatewayError::InvalidResponse {
            node: node.id.clone(),
            detail: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_format() {
        let node = Node::new("home-nas", "100.64.0.7", 55743);
        assert_eq!(
            HttpGateway::endpoint(&node, paths::CORE_STATS),
            "http://100.64.0.7:55743/rc/core/stats"
        );
        assert_eq!(
            HttpGateway::endpoint(&node, "/job/stop"),
            "http://100.64.0.7:55743/rc/job/stop"
        );
    }

    #[test]
    fn test_default_timeout() {
        let gateway = HttpGateway::new().unwrap();
        assert_eq!(gateway.default_timeout(), Duration::from_secs(300));
    }
}
