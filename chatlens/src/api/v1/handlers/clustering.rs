use axum::extract::State;

use crate::api::v1::dto::{ClusterSegmentsRequest, ClusterSegmentsResponse};
use crate::api::v1::extractors::V1Json;
use crate::api::v1::response::{ApiError, ApiResponse};
use crate::api::AppState;

/// `POST /api/v1/segments:cluster`
///
/// Groups analysed sessions into themes by summary similarity. Segments are
/// assigned in the order given.
#[utoipa::path(
    post,
    path = "/api/v1/segments:cluster",
    tag = "clustering",
    operation_id = "segments.cluster",
    request_body = ClusterSegmentsRequest,
    responses(
        (status = 200, description = "Theme clusters", body = ClusterSegmentsResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 502, description = "Embedding provider failed", body = ApiError),
    )
)]
pub async fn cluster_segments(
    State(state): State<AppState>,
    V1Json(req): V1Json<ClusterSegmentsRequest>,
) -> ApiResponse<ClusterSegmentsResponse> {
    let threshold = req
        .similarity_threshold
        .unwrap_or(state.clusterer.config().similarity_threshold);

    match state
        .clusterer
        .cluster_with_threshold(&req.segments, threshold)
        .await
    {
        Ok(clusters) => ApiResponse::success(ClusterSegmentsResponse { clusters }),
        Err(e) => e.into(),
    }
}
