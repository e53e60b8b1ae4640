use std::sync::Arc;

use crate::analysis::SessionAnalyzer;
use crate::clustering::ThemeClusterer;
use crate::config::Config;
use crate::embeddings::{Embedder, EmbeddingProvider};
use crate::llm::{LlmBackend, LlmProvider, Summarizer};

/// What `/health` reports about the configured model providers.
#[derive(Debug, Clone, Default)]
pub struct ServiceInfo {
    pub summarizer_provider: Option<String>,
    pub summarizer_model: Option<String>,
    pub embedding_model: String,
    pub embedding_dimensions: usize,
}

impl ServiceInfo {
    pub fn from_providers(llm: &LlmProvider, embeddings: &EmbeddingProvider) -> Self {
        let summarizer_provider = match llm.backend() {
            LlmBackend::OpenAI => Some("openai"),
            LlmBackend::OpenRouter => Some("openrouter"),
            LlmBackend::Ollama => Some("ollama"),
            LlmBackend::LmStudio => Some("lmstudio"),
            LlmBackend::OpenAICompatible { .. } => Some("openai-compatible"),
            LlmBackend::Unavailable { .. } => None,
        };

        Self {
            summarizer_provider: summarizer_provider.map(str::to_string),
            summarizer_model: llm.model_name().map(str::to_string),
            embedding_model: embeddings.model().to_string(),
            embedding_dimensions: embeddings.dimensions(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub analyzer: SessionAnalyzer,
    pub clusterer: ThemeClusterer,
    pub services: ServiceInfo,
}

impl AppState {
    pub fn new(
        config: Config,
        summarizer: Arc<dyn Summarizer>,
        embedder: Arc<dyn Embedder>,
        services: ServiceInfo,
    ) -> Self {
        let analyzer = SessionAnalyzer::new(summarizer, config.analysis.clone());
        let clusterer = ThemeClusterer::new(embedder, config.clustering.clone());

        Self {
            config: Arc::new(config),
            analyzer,
            clusterer,
            services,
        }
    }
}
