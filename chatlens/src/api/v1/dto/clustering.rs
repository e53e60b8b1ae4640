use serde::{Deserialize, Serialize};

use crate::models::{AnalysisResult, ThemeCluster};

/// Request body for `POST /api/v1/segments:cluster`.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSegmentsRequest {
    pub segments: Vec<AnalysisResult>,
    /// Overrides the configured threshold. Must lie within `[-1, 1]`.
    #[serde(default)]
    pub similarity_threshold: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ClusterSegmentsResponse {
    pub clusters: Vec<ThemeCluster>,
}
