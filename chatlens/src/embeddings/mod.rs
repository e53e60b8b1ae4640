mod api;
mod provider;


use async_trait::async_trait;

use crate::error::Result;

pub use api::{ApiConfig, EmbeddingApiClient};
pub use provider::EmbeddingProvider;

/// Maps a piece of text to a dense vector. Every call within one run must
/// return vectors of the same length.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}
