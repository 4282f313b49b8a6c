//! Liveness endpoint
//!
//! Reports whether the controller is editing or saving a batch, so a client
//! reconnecting mid-run knows to follow `/batch/events` instead of editing.

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::session::ControllerMode;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub module: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub mode: ControllerMode,
    /// Set when the last batch run failed or was aborted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let controller = state.controller.status().await;
    let uptime_seconds = Utc::now()
        .signed_duration_since(state.startup_time)
        .num_seconds()
        .max(0) as u64;

    Json(HealthResponse {
        status: "ok",
        module: "acdc",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds,
        mode: controller.mode,
        last_error: controller.last_error,
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
