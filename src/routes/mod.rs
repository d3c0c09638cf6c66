pub mod embeddings;
pub mod evaluate;
pub mod health;
pub mod rubrics;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .route("/rubrics", get(rubrics::get_default_rubrics))
        .route("/evaluate", post(evaluate::evaluate_answer))
        .route("/evaluate_stream", post(evaluate::evaluate_answer_stream))
        .route("/embeddings/:word", get(embeddings::get_word_embedding))
        .with_state(state)
}
