use axum::extract::State;
use serde::Serialize;

use crate::api::state::AppState;
use crate::api::v1::response::ApiResponse;

/// Health data returned inside the v1 envelope.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct HealthData {
    pub status: String,
    pub version: String,
    pub summarizer: SummarizerStatus,
    pub embeddings: EmbeddingsStatus,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct SummarizerStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct EmbeddingsStatus {
    pub status: String,
    pub model: String,
    pub dimensions: usize,
}

/// `GET /api/v1/health`
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "health",
    responses(
        (status = 200, description = "Service health status", body = HealthData),
    )
)]
pub async fn health_check(State(state): State<AppState>) -> ApiResponse<HealthData> {
    let services = &state.services;

    let summarizer = match &services.summarizer_provider {
        Some(provider) => SummarizerStatus {
            status: "available".to_string(),
            provider: Some(provider.clone()),
            model: services.summarizer_model.clone(),
        },
        None => SummarizerStatus {
            status: "unavailable".to_string(),
            provider: None,
            model: None,
        },
    };

    ApiResponse::success(HealthData {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        summarizer,
        embeddings: EmbeddingsStatus {
            status: "ok".to_string(),
            model: services.embedding_model.clone(),
            dimensions: services.embedding_dimensions,
        },
    })
}
