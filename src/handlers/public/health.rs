// handlers/public/health.rs - GET / and GET /health
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde_json::{json, Value};

use crate::state::AppState;

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Dashboard API",
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = Utc::now();

    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "message": "ok",
                "timestamp": now,
                "store": "ok",
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": {"code": "unknown", "message": "document store unavailable"},
                    "timestamp": now,
                })),
            )
        }
    }
}
