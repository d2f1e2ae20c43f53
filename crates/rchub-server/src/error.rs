//! Error types for the control plane

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rchub_connect::{ConnectError, GatewayError};
use rchub_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HubError {
    /// Malformed or missing fields, unsupported kind
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Unknown node {0}")]
    NodeNotFound(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// Node that owns an existing job is no longer configured
    #[error("Node {0} not found")]
    OwnerNodeNotFound(String),

    /// Agent unreachable or agent-side error, surfaced verbatim
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Invalid API key")]
    Unauthorized,

    #[error("Store error: {0}")]
    Store(StoreError),

    /// Background dispatch task panicked or was aborted
    #[error("Internal error: {0}")]
    Internal(String),
}

impl HubError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            HubError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            HubError::NodeNotFound(_)
            | HubError::JobNotFound(_)
            | HubError::OwnerNodeNotFound(_) => StatusCode::NOT_FOUND,
            HubError::Gateway(_) => StatusCode::BAD_GATEWAY,
            HubError::Unauthorized => StatusCode::UNAUTHORIZED,
            HubError::Store(_) | HubError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ConnectError> for HubError {
    fn from(err: ConnectError) -> Self {
        match err {
            ConnectError::NodeNotFound(id) => HubError::NodeNotFound(id),
            ConnectError::InvalidNode(msg) => HubError::InvalidRequest(msg),
        }
    }
}

impl From<StoreError> for HubError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::JobNotFound(uid) => HubError::JobNotFound(uid),
            other => HubError::Store(other),
        }
    }
}

impl IntoResponse for HubError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("{}", self);
        }

        let body = serde_json::json!({ "detail": self.to_string() });
        (status, Json(body)).into_response()
    }
}

pub type HubResult<T> = Result<T, HubError>;
