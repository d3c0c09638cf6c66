use axum::{extract::State, Json};

use crate::models::Criterion;
use crate::state::AppState;

/// Return the default rubrics loaded at start-up
pub async fn get_default_rubrics(State(state): State<AppState>) -> Json<Vec<Criterion>> {
    Json(state.rubrics.criteria().to_vec())
}
