pub mod stream;

use anyhow::Result as AnyResult;

use crate::ai::Message;
use crate::errors::{AppError, Result};
use crate::guardrails::{run_guardrails, RUBRICS_DELIMITER};
use crate::models::{max_score, AnswerEvaluation, EvaluateRequest, EvaluationResponse, GuardrailVerdict};
use crate::state::AppState;

const EVALUATOR_INSTRUCTIONS: &str = r#"You are an expert educational answer evaluator. Your task is to evaluate student answers to programming and technical questions based on provided rubrics.

Follow these guidelines:
1. Carefully read the question and the student's answer
2. Evaluate the answer against each criterion in the rubrics
   - For each criterion, determine which level the answer achieves and report that level first
   - Include the criterion name, achieved level name, and the corresponding value in your evaluation
   - Include a quote of the answer where the specific criterion was judged.
3. Provide concise, constructive feedback that helps the student learn (keep the feedback about 2-3 paragraphs and 20-80 words maximum)
4. Mark the answer as correct when its rating reaches at least 50% of the maximum achievable score
5. Be fair and consistent in your evaluations

Your evaluation should be thorough but concise. Do not include detailed reasoning in your output, as the rubrics evaluation will show how the score was calculated."#;

/// Reject submissions with missing or blank fields before any capability
/// call is made.
pub fn ensure_required_fields(request: &EvaluateRequest) -> Result<()> {
    if request.question.trim().is_empty() || request.answer.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "Both question and answer are required".to_string(),
        ));
    }
    Ok(())
}

/// The evaluation input assembled for one request: the raw text the
/// guardrails inspect, the full message list for the scoring call, and the
/// maximum achievable score under the rubric in effect.
pub(crate) struct PreparedEvaluation {
    pub user_input: String,
    pub messages: Vec<Message>,
    pub max_score: i64,
}

/// Compose the scoring prompt. Caller-supplied rubrics are serialized into
/// the input after the rubrics delimiter; otherwise the prompt omits rubric
/// text and a separate context message carries retrieved or default rubrics,
/// with max-score accounting always based on the default rubric.
pub(crate) async fn prepare(state: &AppState, request: &EvaluateRequest) -> Result<PreparedEvaluation> {
    match &request.rubrics {
        Some(rubrics) => {
            let rubrics_json = serde_json::to_string(rubrics)
                .map_err(|e| AppError::Internal(format!("Failed to serialize rubrics: {}", e)))?;
            let user_input =
                build_user_input(&request.question, &request.answer, Some(&rubrics_json));
            let messages = vec![
                Message::system(EVALUATOR_INSTRUCTIONS),
                Message::user(user_input.clone()),
            ];
            Ok(PreparedEvaluation {
                user_input,
                messages,
                max_score: max_score(rubrics),
            })
        }
        None => {
            let user_input = build_user_input(&request.question, &request.answer, None);
            let context = rubric_context(state).await;
            let messages = vec![
                Message::system(EVALUATOR_INSTRUCTIONS),
                Message::system(format!(
                    "No rubrics were supplied with the submission. Evaluate against the following rubrics:\n{}",
                    context
                )),
                Message::user(user_input.clone()),
            ];
            Ok(PreparedEvaluation {
                user_input,
                messages,
                max_score: max_score(state.rubrics.criteria()),
            })
        }
    }
}

/// Rubric context for prompts that carry no caller-supplied rubrics: try
/// the document-search capability first, fall back to the default rubric.
async fn rubric_context(state: &AppState) -> String {
    if let Some(store_id) = &state.config.evaluation.rubrics_vector_store_id {
        match state.openai.search_vector_store(store_id, "rubrics.json").await {
            Ok(Some(text)) => return text,
            Ok(None) => {
                tracing::debug!("Vector store returned no rubric context, using default rubric")
            }
            Err(e) => tracing::warn!("Rubric retrieval failed, using default rubric: {}", e),
        }
    }

    serde_json::to_string(state.rubrics.criteria()).unwrap_or_else(|_| "[]".to_string())
}

pub(crate) fn build_user_input(question: &str, answer: &str, rubrics_json: Option<&str>) -> String {
    match rubrics_json {
        Some(json) => format!(
            "Question: {}\n\nStudent Answer: {}{} {}",
            question, answer, RUBRICS_DELIMITER, json
        ),
        None => format!("Question: {}\n\nStudent Answer: {}", question, answer),
    }
}

/// JSON schema the scoring capability must answer with.
pub(crate) fn answer_evaluation_response_format() -> serde_json::Value {
    serde_json::json!({
        "type": "json_schema",
        "json_schema": {
            "name": "answer_evaluation",
            "strict": true,
            "schema": {
                "type": "object",
                "properties": {
                    "feedback": { "type": "string" },
                    "is_correct": { "type": "boolean" },
                    "rubrics": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "criterion": { "type": "string" },
                                "levels": {
                                    "type": "array",
                                    "items": {
                                        "type": "object",
                                        "properties": {
                                            "name": { "type": "string" },
                                            "value": { "type": "integer" },
                                            "description": { "type": "string" },
                                            "quote": { "type": "string" }
                                        },
                                        "required": ["name", "value", "description", "quote"],
                                        "additionalProperties": false
                                    }
                                }
                            },
                            "required": ["criterion", "levels"],
                            "additionalProperties": false
                        }
                    }
                },
                "required": ["feedback", "is_correct", "rubrics"],
                "additionalProperties": false
            }
        }
    })
}

/// Run the full blocking evaluation pipeline: validate, guardrails, one
/// scoring call, response shaping.
pub async fn evaluate(state: &AppState, request: EvaluateRequest) -> Result<EvaluationResponse> {
    ensure_required_fields(&request)?;

    let prepared = prepare(state, &request).await?;

    match run_guardrails(state, &prepared.user_input).await {
        Ok(GuardrailVerdict::Pass) => {}
        Ok(GuardrailVerdict::Rejected(rejection)) => return Err(rejection.into()),
        Err(e) => return Err(AppError::Upstream(format!("Guardrail check failed: {}", e))),
    }

    let content = state
        .openai
        .chat(
            &state.config.evaluation.evaluator_model,
            &prepared.messages,
            Some(answer_evaluation_response_format()),
        )
        .await
        .map_err(|e| AppError::Upstream(format!("Scoring call failed: {}", e)))?;

    let evaluation = parse_evaluation(&content)
        .map_err(|e| AppError::Upstream(format!("Scoring capability returned malformed output: {}", e)))?;

    Ok(EvaluationResponse {
        rating: evaluation.rating(),
        feedback: evaluation.feedback,
        is_correct: evaluation.is_correct,
        rubrics: evaluation.rubrics,
        max_score: prepared.max_score,
    })
}

/// Validate the structured output shape on receipt instead of trusting the
/// capability's own validation.
fn parse_evaluation(content: &str) -> AnyResult<AnswerEvaluation> {
    Ok(serde_json::from_str(content)?)
}
