//! v1 session analysis handlers.
//!
//! `POST /api/v1/analyze` summarizes one free-form conversation.
//! `POST /api/v1/sessions:analyze` segments a transcript and returns the run
//! report once every session has settled; `POST /api/v1/sessions:stream`
//! does the same work but pushes each filled session as a Server-Sent Event.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use tokio::sync::mpsc;
use tokio_util::task::AbortOnDropHandle;

use crate::analysis::NoProgress;
use crate::api::v1::dto::{
    AnalyzeConversationRequest, AnalyzeSessionsRequest, SessionProgressEvent,
};
use crate::api::v1::extractors::V1Json;
use crate::api::v1::response::{ApiError, ApiResponse};
use crate::api::AppState;
use crate::error::Result;
use crate::models::{AnalysisReport, AnalysisResult, SessionSummary};
use crate::segmentation::{segment_by_minutes, Session};

/// `POST /api/v1/analyze`
#[utoipa::path(
    post,
    path = "/api/v1/analyze",
    tag = "analysis",
    operation_id = "conversation.analyze",
    request_body = AnalyzeConversationRequest,
    responses(
        (status = 200, description = "Conversation summary", body = SessionSummary),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 501, description = "No summarizer configured", body = ApiError),
        (status = 502, description = "Summarizer failed", body = ApiError),
    )
)]
pub async fn analyze_conversation(
    State(state): State<AppState>,
    V1Json(req): V1Json<AnalyzeConversationRequest>,
) -> ApiResponse<SessionSummary> {
    let text = req.into_text();
    match state.analyzer.summarize_conversation(&text).await {
        Ok(summary) => ApiResponse::success(summary),
        Err(e) => e.into(),
    }
}

/// `POST /api/v1/sessions:analyze`
///
/// Sessions whose summarizer call failed are listed in `failedSessions`
/// instead of failing the request.
#[utoipa::path(
    post,
    path = "/api/v1/sessions:analyze",
    tag = "analysis",
    operation_id = "sessions.analyze",
    request_body = AnalyzeSessionsRequest,
    responses(
        (status = 200, description = "Run report", body = AnalysisReport),
        (status = 400, description = "Invalid request or unparseable timestamp", body = ApiError),
    )
)]
pub async fn analyze_sessions(
    State(state): State<AppState>,
    V1Json(req): V1Json<AnalyzeSessionsRequest>,
) -> ApiResponse<AnalysisReport> {
    let sessions = match prepare_sessions(&state, req) {
        Ok(sessions) => sessions,
        Err(e) => return e.into(),
    };

    let report = state.analyzer.analyze_sessions(&sessions, &NoProgress).await;
    ApiResponse::success(report)
}

/// `POST /api/v1/sessions:stream`
///
/// Emits one `progress` event per filled session, then a single `done` event
/// carrying the run report. Request errors are answered with the usual
/// envelope before the stream starts.
#[utoipa::path(
    post,
    path = "/api/v1/sessions:stream",
    tag = "analysis",
    operation_id = "sessions.stream",
    request_body = AnalyzeSessionsRequest,
    responses(
        (status = 200, description = "Event stream of `progress` events followed by `done`", content_type = "text/event-stream", body = SessionProgressEvent),
        (status = 400, description = "Invalid request or unparseable timestamp", body = ApiError),
    )
)]
pub async fn stream_sessions(
    State(state): State<AppState>,
    V1Json(req): V1Json<AnalyzeSessionsRequest>,
) -> Response {
    let sessions = match prepare_sessions(&state, req) {
        Ok(sessions) => sessions,
        Err(e) => return ApiResponse::<()>::from(e).into_response(),
    };

    let (tx, mut rx) = mpsc::unbounded_channel::<SessionProgressEvent>();
    let analyzer = state.analyzer.clone();

    // Dropping the response stream (client gone) aborts the run.
    let run = AbortOnDropHandle::new(tokio::spawn(async move {
        let sink = move |result: &AnalysisResult, completed: usize, total: usize| {
            let _ = tx.send(SessionProgressEvent {
                result: result.clone(),
                completed,
                total,
            });
        };
        analyzer.analyze_sessions(&sessions, &sink).await
    }));

    let events = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            yield Event::default().event("progress").json_data(&event);
        }

        match run.await {
            Ok(report) => yield Event::default().event("done").json_data(&report),
            Err(error) => {
                tracing::error!(%error, "Session analysis task failed");
                yield Ok(Event::default().event("error").data("An internal error occurred"));
            }
        }
    };

    Sse::new(events)
        .keep_alive(KeepAlive::default())
        .into_response()
}

fn prepare_sessions(state: &AppState, req: AnalyzeSessionsRequest) -> Result<Vec<Session>> {
    let (messages, gap_minutes) = req.resolve(state.config.analysis.gap_minutes)?;
    let sessions = segment_by_minutes(&messages, gap_minutes)?;

    tracing::info!(
        messages = messages.len(),
        sessions = sessions.len(),
        gap_minutes,
        "Segmented transcript"
    );

    Ok(sessions)
}
