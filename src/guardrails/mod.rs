use anyhow::{Context, Result};
use std::collections::BTreeMap;

use crate::ai::Message;
use crate::models::{GuardrailRejection, GuardrailVerdict, ModerationOutcome, RelevanceOutcome};
use crate::state::AppState;

/// Delimiter marking the start of the rubrics section in the evaluation
/// input. Everything after it is scoring context, never student content,
/// so guardrails truncate here before judging the text.
pub const RUBRICS_DELIMITER: &str = "\n\nRubrics:";

/// Strip the rubrics section from the evaluation input so moderation and
/// relevance only ever see the question and answer. Input without the
/// delimiter is returned unchanged; the operation is idempotent.
pub fn strip_rubrics(input: &str) -> &str {
    match input.find(RUBRICS_DELIMITER) {
        Some(index) => &input[..index],
        None => input,
    }
}

/// Run the guardrail pipeline over the raw evaluation input: moderation
/// first, then relevance. The first failing check short-circuits; the
/// second check is never invoked once the first has rejected.
///
/// `Err` means a capability itself failed, which is an upstream problem
/// distinct from a rejection.
pub async fn run_guardrails(state: &AppState, raw_input: &str) -> Result<GuardrailVerdict> {
    let checked_input = strip_rubrics(raw_input);

    let moderation = moderation_check(state, checked_input).await?;
    if moderation.flagged {
        tracing::info!(
            categories = %moderation.flagged_categories.keys().cloned().collect::<Vec<_>>().join(", "),
            "Submission rejected by moderation guardrail"
        );
        return Ok(GuardrailVerdict::Rejected(GuardrailRejection::ContentPolicy {
            reasoning: moderation.reasoning,
            categories: moderation.flagged_categories,
        }));
    }

    let relevance = relevance_check(state, checked_input).await?;
    if !relevance.is_relevant {
        tracing::info!(reasoning = %relevance.reasoning, "Submission rejected by relevance guardrail");
        return Ok(GuardrailVerdict::Rejected(GuardrailRejection::OffTopic {
            reasoning: relevance.reasoning,
        }));
    }

    Ok(GuardrailVerdict::Pass)
}

/// Call the content-safety capability and fold its per-category flags into
/// a single outcome. The raw response is persisted for audit before the
/// result is interpreted.
async fn moderation_check(state: &AppState, input: &str) -> Result<ModerationOutcome> {
    let (result, raw) = state
        .openai
        .moderate(&state.config.evaluation.moderation_model, input)
        .await?;

    persist_moderation_audit(&state.config.evaluation.moderation_audit_path, &raw).await;

    let entry = result
        .results
        .first()
        .context("Moderation response contained no results")?;

    let mut flagged_categories = BTreeMap::new();
    if entry.flagged {
        for (category, is_flagged) in &entry.categories {
            if *is_flagged {
                let score = entry.category_scores.get(category).copied().unwrap_or(0.0);
                flagged_categories.insert(category.clone(), score);
            }
        }
    }

    let reasoning = if entry.flagged {
        let category_list = flagged_categories.keys().cloned().collect::<Vec<_>>().join(", ");
        format!("Content was flagged in the following categories: {}", category_list)
    } else {
        "Content passed moderation check.".to_string()
    };

    Ok(ModerationOutcome {
        reasoning,
        flagged: entry.flagged,
        flagged_categories,
    })
}

/// Best-effort audit write: a failed write must never fail the request.
async fn persist_moderation_audit(path: &str, raw_response: &str) {
    if let Err(e) = tokio::fs::write(path, raw_response).await {
        tracing::warn!("Failed to persist moderation audit to {}: {}", path, e);
    }
}

const RELEVANCE_INSTRUCTIONS: &str = r#"Your task is to determine if a student's answer is relevant to the question being asked.

Follow these guidelines:
1. Extract the topic and key concepts from the question
2. Analyze the answer to see if it addresses the topic
3. Answer might be short or incomplete, but still relevant if it attempts to address or answer the question
4. An answer is irrelevant if it discusses completely unrelated topics
5. An answer is irrelevant if it is a question
6. An answer is irrelevant if its gibberish or nonsensical words

Respond with whether the answer is relevant to the question and your reasoning."#;

/// JSON schema the relevance capability must answer with.
fn relevance_response_format() -> serde_json::Value {
    serde_json::json!({
        "type": "json_schema",
        "json_schema": {
            "name": "relevance_check",
            "strict": true,
            "schema": {
                "type": "object",
                "properties": {
                    "reasoning": { "type": "string" },
                    "is_relevant": { "type": "boolean" }
                },
                "required": ["reasoning", "is_relevant"],
                "additionalProperties": false
            }
        }
    })
}

/// Call the reasoning capability to judge topical relevance of the answer.
async fn relevance_check(state: &AppState, input: &str) -> Result<RelevanceOutcome> {
    let messages = [
        Message::system(RELEVANCE_INSTRUCTIONS),
        Message::user(input),
    ];

    let content = state
        .openai
        .chat(
            &state.config.evaluation.relevance_model,
            &messages,
            Some(relevance_response_format()),
        )
        .await?;

    serde_json::from_str(&content).context("Relevance check returned malformed output")
}
