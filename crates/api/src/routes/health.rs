use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::state::AppState;

/// Health check routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/v1/ping", get(ping))
}

/// Reports which integrations are configured. Does not call them.
async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let config = state.config();
    Json(json!({
        "status": "ok",
        "model": config.openai.model,
        "googleSignIn": state.google().is_some(),
    }))
}

/// Lightweight ping.
async fn ping() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
