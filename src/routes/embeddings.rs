use axum::{
    extract::{Path, State},
    Json,
};

use crate::errors::{AppError, Result};
use crate::state::AppState;

/// Look up the embedding vector for a single word.
///
/// Thin proxy over the embedding capability; the model itself lives
/// upstream.
pub async fn get_word_embedding(
    State(state): State<AppState>,
    Path(word): Path<String>,
) -> Result<Json<Vec<f32>>> {
    let embedding = state
        .openai
        .embed(&state.config.evaluation.embedding_model, &word)
        .await
        .map_err(|e| AppError::Upstream(format!("Embedding lookup failed: {}", e)))?;

    Ok(Json(embedding))
}
