use axum::{
    extract::State,
    http::header,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    Json,
};
use futures::StreamExt;
use std::convert::Infallible;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::errors::Result;
use crate::evaluator::{self, ensure_required_fields, stream::spawn_evaluation};
use crate::models::{EvaluateRequest, EvaluationResponse};
use crate::state::AppState;

/// Evaluate a student answer in one shot
/// POST /evaluate
pub async fn evaluate_answer(
    State(state): State<AppState>,
    Json(payload): Json<EvaluateRequest>,
) -> Result<Json<EvaluationResponse>> {
    let response = evaluator::evaluate(&state, payload).await?;
    Ok(Json(response))
}

/// Evaluate a student answer with a streaming response
/// POST /evaluate_stream
///
/// The worker pushes fragments onto a hand-off channel; this handler only
/// forwards them as SSE data lines until the channel closes. Guardrail
/// rejections and upstream failures arrive as in-band terminal events.
pub async fn evaluate_answer_stream(
    State(state): State<AppState>,
    Json(payload): Json<EvaluateRequest>,
) -> Result<impl IntoResponse> {
    // Field validation still gets a plain 400: nothing has been streamed yet.
    ensure_required_fields(&payload)?;

    let receiver = spawn_evaluation(state, payload);

    let sse_stream = UnboundedReceiverStream::new(receiver)
        .flat_map(|event| futures::stream::iter(event.into_data_frames()))
        .map(|frame| Ok::<Event, Infallible>(Event::default().data(frame)));

    Ok((
        [(header::CACHE_CONTROL, "no-cache")],
        Sse::new(sse_stream).keep_alive(KeepAlive::default()),
    ))
}
