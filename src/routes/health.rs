use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    timestamp: String,
    rubric_criteria: usize,
    version: String,
}

/// Index route kept for clients that probe the service root
async fn index() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "Answer Evaluator API is running"
    }))
}

/// Health check endpoint
///
/// Reports the loaded rubric size so a misconfigured rubric file is
/// visible without hitting the evaluation routes
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now().to_rfc3339(),
        rubric_criteria: state.rubrics.criteria().len(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
}
