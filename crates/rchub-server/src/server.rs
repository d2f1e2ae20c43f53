//! Axum router and server loop

use crate::{api, auth, state::AppState, ServerConfig};
use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::trace::TraceLayer;

/// Landing message served at `/`
pub const LANDING_MESSAGE: &str = "Rclone hub is running. See /v1 for API.";

/// Build the full router: public landing page plus the keyed `/v1` API
pub fn build_router(state: AppState) -> Router {
    let v1 = Router::new()
        .route("/nodes", get(api::list_nodes))
        .route("/remotes", get(api::list_remotes))
        // `:id` is the job kind on POST and the job uid on GET
        .route("/jobs/:id", post(api::create_job).get(api::get_job))
        .route("/jobs/:id/stop", post(api::stop_job))
        .route("/stream", get(api::stream_stats))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    Router::new()
        .route(
            "/",
            get(|| async { Json(json!({ "message": LANDING_MESSAGE })) }),
        )
        .nest("/v1", v1)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the Axum Control Plane server until Ctrl-C
pub async fn run_server(config: &ServerConfig, state: AppState) -> std::io::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Rclone hub listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
