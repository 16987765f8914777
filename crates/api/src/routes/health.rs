use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde_json::{json, Value};

use crate::AppState;

pub fn health_router() -> Router<AppState> {
    Router::new().route("/healthz", get(healthz))
}

/// Liveness probe. No auth.
async fn healthz(State(state): State<AppState>) -> Json<Value> {
    let uptime = (Utc::now() - state.started_at).num_seconds().max(0);
    Json(json!({
        "status": "ok",
        "monitors": state.board.len().await,
        "uptime_secs": uptime,
    }))
}
