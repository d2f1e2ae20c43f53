//! Error types for the rchub-connect crate

use thiserror::Error;

/// Registry errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    #[error("Unknown node {0}")]
    NodeNotFound(String),

    #[error("Invalid node descriptor: {0}")]
    InvalidNode(String),
}

/// Failures while invoking a remote-control operation on an agent
///
/// Every variant names the node that was being called so the caller can
/// surface it verbatim.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Connection refused, DNS failure, timeout, or a broken response stream
    #[error("Error contacting {node}: {detail}")]
    Unreachable { node: String, detail: String },

    /// The agent answered with a non-success HTTP status
    #[error("rc error {status} from {node}: {body}")]
    Remote {
        node: String,
        status: u16,
        body: String,
    },

    /// The agent answered 2xx but the body was not JSON
    #[error("Invalid response from {node}: {detail}")]
    InvalidResponse { node: String, detail: String },

    #[error("Failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
}

impl GatewayError {
    /// Node the failed call was addressed to
    pub fn node(&self) -> Option<&str> {
        match self {
            GatewayError::Unreachable { node, .. }
            | GatewayError::Remote { node, .. }
            | GatewayError::InvalidResponse { node, .. } => Some(node),
            GatewayError::Build(_) => None,
        }
    }
}
