use futures::StreamExt;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::guardrails::run_guardrails;
use crate::models::{EvaluateRequest, GuardrailVerdict};
use crate::state::AppState;

use super::{answer_evaluation_response_format, prepare};

/// Terminal marker emitted after a successful evaluation stream.
pub const COMPLETE_MARKER: &str = "EVALUATION_COMPLETE";
/// Terminal marker emitted after an in-band guardrail rejection.
pub const REJECTED_MARKER: &str = "GUARDRAIL_TRIGGERED";
/// Terminal marker emitted when the scoring capability fails mid-stream.
pub const FAILED_MARKER: &str = "EVALUATION_FAILED";

const UPSTREAM_FAILURE_MESSAGE: &str =
    "The evaluation service is currently unavailable. Please try again later.";

/// One item on the hand-off channel between the evaluation worker and the
/// response writer: zero or more deltas followed by exactly one terminal
/// event. The channel closing after the terminal event is the stream-end
/// sentinel.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Delta(String),
    Complete,
    Rejected(String),
    Failed(String),
}

impl StreamEvent {
    /// The `data:` payload lines the response writer forwards for this
    /// event. Rejections and failures carry their human-readable message
    /// ahead of the terminal marker.
    pub fn into_data_frames(self) -> Vec<String> {
        match self {
            StreamEvent::Delta(fragment) => vec![fragment],
            StreamEvent::Complete => vec![COMPLETE_MARKER.to_string()],
            StreamEvent::Rejected(message) => vec![message, REJECTED_MARKER.to_string()],
            StreamEvent::Failed(message) => vec![message, FAILED_MARKER.to_string()],
        }
    }
}

/// Start one background worker driving the guardrail-then-score pipeline
/// for a streaming request, and hand back the consumer side of the
/// hand-off channel.
///
/// The worker owns all capability calls so the request task only ever
/// waits on the channel. Dropping the receiver (client disconnect) stops
/// the worker at its next send.
pub fn spawn_evaluation(state: AppState, request: EvaluateRequest) -> UnboundedReceiver<StreamEvent> {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        drive_evaluation(state, request, tx).await;
    });

    rx
}

async fn drive_evaluation(
    state: AppState,
    request: EvaluateRequest,
    tx: UnboundedSender<StreamEvent>,
) {
    let prepared = match prepare(&state, &request).await {
        Ok(prepared) => prepared,
        Err(e) => {
            tracing::error!("Failed to prepare streaming evaluation: {}", e);
            let _ = tx.send(StreamEvent::Failed(UPSTREAM_FAILURE_MESSAGE.to_string()));
            return;
        }
    };

    // Guardrails complete strictly before the scoring call begins. A
    // rejection discovered here surfaces in-band: the response headers are
    // already committed once the stream is open.
    match run_guardrails(&state, &prepared.user_input).await {
        Ok(GuardrailVerdict::Pass) => {}
        Ok(GuardrailVerdict::Rejected(rejection)) => {
            let _ = tx.send(StreamEvent::Rejected(rejection.user_message()));
            return;
        }
        Err(e) => {
            tracing::error!("Guardrail check failed during streaming evaluation: {}", e);
            let _ = tx.send(StreamEvent::Failed(UPSTREAM_FAILURE_MESSAGE.to_string()));
            return;
        }
    }

    let mut fragments = match state
        .openai
        .chat_stream(
            &state.config.evaluation.evaluator_model,
            &prepared.messages,
            Some(answer_evaluation_response_format()),
        )
        .await
    {
        Ok(stream) => stream,
        Err(e) => {
            tracing::error!("Failed to start streaming scoring call: {}", e);
            let _ = tx.send(StreamEvent::Failed(UPSTREAM_FAILURE_MESSAGE.to_string()));
            return;
        }
    };

    while let Some(item) = fragments.next().await {
        match item {
            Ok(fragment) => {
                if tx.send(StreamEvent::Delta(fragment)).is_err() {
                    tracing::debug!("Client disconnected, stopping evaluation worker");
                    return;
                }
            }
            Err(e) => {
                tracing::error!("Scoring stream failed mid-flight: {}", e);
                let _ = tx.send(StreamEvent::Failed(UPSTREAM_FAILURE_MESSAGE.to_string()));
                return;
            }
        }
    }

    let _ = tx.send(StreamEvent::Complete);
}
