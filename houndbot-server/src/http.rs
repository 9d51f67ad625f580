//! src/http.rs
//!
//! Minimal HTTP intake: `/?move=<verb>` submits a direct command, and the
//! three stat paths return `{"stat": ...}` JSON for the display page.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::info;

use houndbot_core::service::CrowdControlService;

pub async fn serve(
    addr: String,
    service: Arc<CrowdControlService>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let app = Router::new()
        .route("/", get(root))
        .route("/battery", get(battery))
        .route("/viewcount", get(viewcount))
        .route("/lastcommand", get(lastcommand))
        .layer(TraceLayer::new_for_http())
        .with_state(service);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("starting http intake on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
        })
        .await
}

#[derive(Debug, Deserialize)]
struct RootParams {
    #[serde(rename = "move")]
    movement: Option<String>,
}

async fn root(
    State(service): State<Arc<CrowdControlService>>,
    Query(params): Query<RootParams>,
) -> impl IntoResponse {
    let Some(text) = params.movement else {
        return (StatusCode::BAD_REQUEST, "missing 'move' parameter".to_string());
    };
    let text = text.replace(' ', "");
    match service.submit_command(&text).await {
        Ok(()) => (
            StatusCode::OK,
            format!("The robot is now going to {}", text),
        ),
        Err(e) => (StatusCode::BAD_REQUEST, e.to_string()),
    }
}

async fn battery(State(service): State<Arc<CrowdControlService>>) -> impl IntoResponse {
    let stats = service.stats().await;
    Json(json!({ "stat": stats.battery_percent }))
}

async fn viewcount(State(service): State<Arc<CrowdControlService>>) -> impl IntoResponse {
    let stats = service.stats().await;
    Json(json!({ "stat": stats.viewers }))
}

async fn lastcommand(State(service): State<Arc<CrowdControlService>>) -> impl IntoResponse {
    let stats = service.stats().await;
    Json(json!({ "stat": stats.last_command }))
}
