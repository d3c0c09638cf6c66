use serde::{Deserialize, Serialize};

use super::rubric::Criterion;

/// Body of `POST /evaluate` and `POST /evaluate_stream`.
///
/// Missing fields deserialize to empty strings so the handlers can reject
/// them with the stable "required" message rather than a framework error.
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluateRequest {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub rubrics: Option<Vec<Criterion>>,
}

/// Structured output expected back from the scoring capability.
///
/// Each returned criterion carries the achieved level first; `is_correct`
/// is the capability's own judgment (rating >= 50% of the maximum score)
/// and is passed through untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerEvaluation {
    pub feedback: String,
    pub is_correct: bool,
    pub rubrics: Vec<Criterion>,
}

impl AnswerEvaluation {
    /// Recompute the numeric rating locally as a cross-check: the sum of the
    /// achieved (first reported) level value per criterion.
    pub fn rating(&self) -> i64 {
        self.rubrics
            .iter()
            .filter_map(|criterion| criterion.levels.first())
            .map(|level| level.value)
            .sum()
    }
}

/// Body of a successful `POST /evaluate` response.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationResponse {
    pub rating: i64,
    pub feedback: String,
    pub is_correct: bool,
    pub rubrics: Vec<Criterion>,
    pub max_score: i64,
}
