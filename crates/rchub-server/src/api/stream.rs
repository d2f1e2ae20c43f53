//! NDJSON live stats endpoint

use crate::state::AppState;
use axum::{
    body::Body,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use tokio_stream::StreamExt;

pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Stream one JSON line per node per polling round until the client leaves
pub async fn stream_stats(State(state): State<AppState>) -> Response {
    let lines = state
        .streamer
        .subscribe()
        .map(|event| event.to_ndjson_line());

    (
        [(header::CONTENT_TYPE, NDJSON_CONTENT_TYPE)],
        Body::from_stream(lines),
    )
        .into_response()
}
