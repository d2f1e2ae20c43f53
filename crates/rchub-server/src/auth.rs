//! Shared-secret API key middleware

use crate::error::HubError;
use crate::state::AppState;
use axum::{extract::Request, extract::State, middleware::Next, response::Response};
use subtle::ConstantTimeEq;

/// Header carrying the shared secret
pub const API_KEY_HEADER: &str = "x-api-key";

/// Compare a presented key with the configured one in constant time
///
/// Only the length of the configured key can leak through timing.
pub fn key_matches(presented: Option<&[u8]>, expected: &str) -> bool {
    match presented {
        Some(presented) => presented.ct_eq(expected.as_bytes()).into(),
        None => false,
    }
}

/// Axum middleware rejecting requests without the configured API key
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, HubError> {
    if let Some(expected) = state.api_key.as_deref() {
        let presented = request
            .headers()
            .get(API_KEY_HEADER)
            .map(|value| value.as_bytes());

        if !key_matches(presented, expected) {
            tracing::warn!("Rejected request to {} with bad API key", request.uri().path());
            return Err(HubError::Unauthorized);
        }
    }

    Ok(next.run(request).await)
}
