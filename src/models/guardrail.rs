use std::collections::BTreeMap;

use crate::errors::AppError;

/// Result of the content-safety check, including the raw category scores
/// for any violation the capability reported.
#[derive(Debug, Clone)]
pub struct ModerationOutcome {
    pub reasoning: String,
    pub flagged: bool,
    pub flagged_categories: BTreeMap<String, f64>,
}

/// Result of the topical-relevance check.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RelevanceOutcome {
    pub reasoning: String,
    pub is_relevant: bool,
}

/// Outcome of the guardrail pipeline: either every check passed, or the
/// first failing check's rejection.
#[derive(Debug, Clone)]
pub enum GuardrailVerdict {
    Pass,
    Rejected(GuardrailRejection),
}

/// A typed rejection, tagged by the guardrail that produced it.
#[derive(Debug, Clone)]
pub enum GuardrailRejection {
    ContentPolicy {
        reasoning: String,
        categories: BTreeMap<String, f64>,
    },
    OffTopic {
        reasoning: String,
    },
}

impl GuardrailRejection {
    /// Human-readable message shown to the student, both in 400 bodies and
    /// as the in-band rejection text on the streaming path.
    pub fn user_message(&self) -> String {
        match self {
            GuardrailRejection::ContentPolicy { categories, .. } => {
                let mut message = "Your submission contains inappropriate language.".to_string();
                if !categories.is_empty() {
                    let category_list = categories.keys().cloned().collect::<Vec<_>>().join(", ");
                    message.push_str(&format!(
                        " Content was flagged in these categories: {}.",
                        category_list
                    ));
                }
                message.push_str(" Please revise your answer.");
                message
            }
            GuardrailRejection::OffTopic { .. } => {
                "Your answer appears to be unrelated to the question. Please provide a relevant \
                 response to the question being asked."
                    .to_string()
            }
        }
    }
}

impl From<GuardrailRejection> for AppError {
    fn from(rejection: GuardrailRejection) -> Self {
        let message = rejection.user_message();
        match rejection {
            GuardrailRejection::ContentPolicy { .. } => AppError::ContentPolicy { message },
            GuardrailRejection::OffTopic { .. } => AppError::OffTopic { message },
        }
    }
}
