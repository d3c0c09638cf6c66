use serde::{Deserialize, Serialize};

/// One achievement level within a criterion.
///
/// `value` is the scoring weight of the level; levels are ordered within
/// their criterion only, and the maximum value is not necessarily first.
/// `quote` is filled in by the scoring capability to justify the level it
/// picked; rubric definitions leave it empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionLevel {
    pub name: String,
    pub value: i64,
    pub description: String,
    #[serde(default)]
    pub quote: String,
}

/// One axis of evaluation (e.g. "Understanding of Concepts") with its
/// possible levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub criterion: String,
    pub levels: Vec<CriterionLevel>,
}

/// Maximum achievable score over a rubric: the sum of each criterion's
/// highest level value.
pub fn max_score(rubrics: &[Criterion]) -> i64 {
    rubrics
        .iter()
        .map(|criterion| {
            criterion
                .levels
                .iter()
                .map(|level| level.value)
                .max()
                .unwrap_or(0)
        })
        .sum()
}
