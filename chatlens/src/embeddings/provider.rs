use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::config::{default_base_url, parse_provider_model, EmbeddingApiFormat, EmbeddingsConfig};
use crate::embeddings::api::{ApiConfig, EmbeddingApiClient, OLLAMA_NATIVE_BASE_URL};
use crate::embeddings::Embedder;
use crate::error::{ChatlensError, Result};

#[derive(Clone)]
enum EmbeddingBackend {
    Local {
        model: Arc<Mutex<TextEmbedding>>,
        batch_size: usize,
    },
    Api {
        client: EmbeddingApiClient,
        batch_size: usize,
    },
}

/// Text embedding through either an in-process fastembed model or an HTTP
/// embedding server, selected by the model prefix.
#[derive(Clone)]
pub struct EmbeddingProvider {
    backend: EmbeddingBackend,
    model: String,
    dimensions: usize,
}

impl EmbeddingProvider {
    pub fn new(config: &EmbeddingsConfig) -> Result<Self> {
        let (provider, model_name) = parse_provider_model(&config.model);

        if provider == "local" {
            Self::new_local(config, model_name)
        } else {
            Self::new_api(config, provider, model_name)
        }
    }

    fn new_local(config: &EmbeddingsConfig, model_name: &str) -> Result<Self> {
        let model = build_model(resolve_embedding_model(model_name))?;

        Ok(Self {
            backend: EmbeddingBackend::Local {
                model: Arc::new(Mutex::new(model)),
                batch_size: config.batch_size.max(1),
            },
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }

    fn new_api(config: &EmbeddingsConfig, provider: &str, model_name: &str) -> Result<Self> {
        let needs_api_key = !matches!(provider.to_lowercase().as_str(), "ollama" | "lmstudio");
        if needs_api_key && config.api_key.is_none() {
            return Err(ChatlensError::Embedding(format!(
                "EMBEDDING_API_KEY is required for provider {provider}"
            )));
        }

        let base_url = config.base_url.clone().unwrap_or_else(|| {
            match config.api_format {
                EmbeddingApiFormat::Ollama => OLLAMA_NATIVE_BASE_URL,
                EmbeddingApiFormat::OpenAi => default_base_url(provider),
            }
            .to_string()
        });

        let client = EmbeddingApiClient::new(ApiConfig {
            base_url,
            api_key: config.api_key.clone(),
            model: model_name.to_string(),
            format: config.api_format,
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
        })?;

        Ok(Self {
            backend: EmbeddingBackend::Api {
                client,
                batch_size: config.batch_size.max(1),
            },
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }

    pub async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        match &self.backend {
            EmbeddingBackend::Local { model, batch_size } => {
                let model = Arc::clone(model);
                let batch_size = *batch_size;
                tokio::task::spawn_blocking(move || {
                    let mut model = model.lock().map_err(|e| {
                        ChatlensError::Embedding(format!("Embedding model lock poisoned: {e}"))
                    })?;
                    model
                        .embed(texts, Some(batch_size))
                        .map_err(|e| ChatlensError::Embedding(e.to_string()))
                })
                .await
                .map_err(|e| ChatlensError::Embedding(format!("Embedding worker failed: {e}")))?
            }
            EmbeddingBackend::Api { client, batch_size } => {
                let mut all_embeddings = Vec::with_capacity(texts.len());
                for batch in texts.chunks(*batch_size) {
                    let inputs: Vec<&str> = batch.iter().map(String::as_str).collect();
                    let mut embedded = client.embed(&inputs).await?;
                    if embedded.len() != inputs.len() {
                        return Err(ChatlensError::Embedding(format!(
                            "Expected {} embeddings, got {}",
                            inputs.len(),
                            embedded.len()
                        )));
                    }
                    all_embeddings.append(&mut embedded);
                }
                Ok(all_embeddings)
            }
        }
    }

    pub async fn embed_single(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(vec![text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| ChatlensError::Embedding("No embedding generated".to_string()))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn is_local(&self) -> bool {
        matches!(self.backend, EmbeddingBackend::Local { .. })
    }

    /// Vector length the backend actually produces. Local models are trusted
    /// to match the configured size; API backends are queried once.
    pub async fn detect_dimensions(&self) -> Result<usize> {
        match &self.backend {
            EmbeddingBackend::Local { .. } => Ok(self.dimensions),
            EmbeddingBackend::Api { client, .. } => client.detect_dimensions().await,
        }
    }
}

#[async_trait]
impl Embedder for EmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_single(text).await
    }
}

fn resolve_embedding_model(model_name: &str) -> EmbeddingModel {
    match model_name {
        "BAAI/bge-small-en-v1.5" | "bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
        "BAAI/bge-base-en-v1.5" | "bge-base-en-v1.5" => EmbeddingModel::BGEBaseENV15,
        "BAAI/bge-large-en-v1.5" | "bge-large-en-v1.5" => EmbeddingModel::BGELargeENV15,
        "all-MiniLM-L6-v2" | "sentence-transformers/all-MiniLM-L6-v2" => {
            EmbeddingModel::AllMiniLML6V2
        }
        "all-MiniLM-L12-v2" | "sentence-transformers/all-MiniLM-L12-v2" => {
            EmbeddingModel::AllMiniLML12V2
        }
        "mxbai-embed-large-v1" | "mixedbread-ai/mxbai-embed-large-v1" => {
            EmbeddingModel::MxbaiEmbedLargeV1
        }
        "nomic-embed-text-v1.5" | "nomic-ai/nomic-embed-text-v1.5" => {
            EmbeddingModel::NomicEmbedTextV15
        }
        _ => EmbeddingModel::BGESmallENV15,
    }
}

fn build_model(embedding_model: EmbeddingModel) -> Result<TextEmbedding> {
    TextEmbedding::try_new(InitOptions::new(embedding_model).with_show_download_progress(true))
        .map_err(|e| ChatlensError::Embedding(e.to_string()))
}
