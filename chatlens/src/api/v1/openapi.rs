use axum::Json;
use utoipa::OpenApi;

use super::dto;
use super::handlers;
use super::response;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Chatlens API",
        version = "1.0.0",
        description = "Splits chat transcripts into sessions, summarizes them and groups them into themes.",
    ),
    paths(
        handlers::health::health_check,
        handlers::analysis::analyze_conversation,
        handlers::analysis::analyze_sessions,
        handlers::analysis::stream_sessions,
        handlers::clustering::cluster_segments,
    ),
    components(schemas(
        // Response envelope
        response::ErrorCode,
        response::ApiError,
        // Domain
        models::Message,
        models::Mood,
        models::RelationshipType,
        models::SessionSummary,
        models::AnalysisResult,
        models::AnalysisReport,
        models::SessionFailure,
        models::ThemeCluster,
        // Requests and events
        dto::ConversationLine,
        dto::AnalyzeConversationRequest,
        dto::AnalyzeSessionsRequest,
        dto::SessionProgressEvent,
        dto::ClusterSegmentsRequest,
        dto::ClusterSegmentsResponse,
        // Health (handler-local types)
        handlers::health::HealthData,
        handlers::health::SummarizerStatus,
        handlers::health::EmbeddingsStatus,
    )),
    tags(
        (name = "health", description = "Health check"),
        (name = "analysis", description = "Session segmentation and summarization"),
        (name = "clustering", description = "Theme clustering of analysed sessions"),
    ),
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
