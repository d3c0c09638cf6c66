pub mod evaluation;
pub mod guardrail;
pub mod rubric;

pub use evaluation::{AnswerEvaluation, EvaluateRequest, EvaluationResponse};
pub use guardrail::{GuardrailRejection, GuardrailVerdict, ModerationOutcome, RelevanceOutcome};
pub use rubric::{max_score, Criterion, CriterionLevel};
