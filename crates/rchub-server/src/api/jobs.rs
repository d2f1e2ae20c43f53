//! Job management API endpoints

use crate::error::{HubError, HubResult};
use crate::orchestrator::{JobRequest, StopOutcome};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::HeaderMap,
    Json,
};
use rchub_store::Job;
use serde::{Deserialize, Serialize};

/// Header that makes a submission idempotent
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Response to a successful submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobCreated {
    #[serde(rename = "jobUid")]
    pub job_uid: String,
}

/// Submit a copy, move or sync job
pub async fn create_job(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    headers: HeaderMap,
    body: Result<Json<JobRequest>, JsonRejection>,
) -> HubResult<Json<JobCreated>> {
    let Json(request) = body.map_err(|e| HubError::InvalidRequest(e.body_text()))?;

    let idempotency_key = headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .map(|value| {
            value.to_str().map_err(|_| {
                HubError::InvalidRequest("Idempotency-Key must be visible ASCII".to_string())
            })
        })
        .transpose()?;

    let job_uid = state
        .orchestrator
        .submit(&kind, request, idempotency_key)
        .await?;

    Ok(Json(JobCreated { job_uid }))
}

/// Current record of a job
pub async fn get_job(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> HubResult<Json<Job>> {
    Ok(Json(state.orchestrator.status(&uid).await?))
}

/// Stop a running job
pub async fn stop_job(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> HubResult<Json<StopOutcome>> {
    Ok(Json(state.orchestrator.stop(&uid).await?))
}
