use axum::{
    routing::{get, post},
    Router,
};

use crate::api::state::AppState;

use super::handlers;

pub fn v1_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/openapi.json", get(super::openapi::openapi_json))
        .route("/analyze", post(handlers::analysis::analyze_conversation))
        .route(
            "/sessions:analyze",
            post(handlers::analysis::analyze_sessions),
        )
        .route("/sessions:stream", post(handlers::analysis::stream_sessions))
        .route(
            "/segments:cluster",
            post(handlers::clustering::cluster_segments),
        )
}
