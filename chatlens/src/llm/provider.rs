use std::sync::Arc;

use crate::config::{parse_llm_provider_model, LlmConfig};
use crate::error::{ChatlensError, Result};
use crate::llm::api::LlmApiClient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmBackend {
    OpenAI,
    OpenRouter,
    Ollama,
    LmStudio,
    OpenAICompatible { base_url: String },
    Unavailable { reason: String },
}

#[derive(Debug, Clone)]
pub struct LlmProvider {
    backend: LlmBackend,
    config: Option<Arc<LlmConfig>>,
}

impl LlmProvider {
    pub fn new(config: Option<&LlmConfig>) -> Self {
        let Some(config) = config else {
            return Self::unavailable("No LLM configuration provided");
        };

        let (provider, _model) = parse_llm_provider_model(&config.model);

        let backend = match provider.to_lowercase().as_str() {
            "openai" => LlmBackend::OpenAI,
            "openrouter" => LlmBackend::OpenRouter,
            "ollama" => LlmBackend::Ollama,
            "lmstudio" => LlmBackend::LmStudio,
            _ => {
                if let Some(base_url) = &config.base_url {
                    LlmBackend::OpenAICompatible {
                        base_url: base_url.clone(),
                    }
                } else {
                    LlmBackend::Unavailable {
                        reason: format!("Unknown provider in model: {}", config.model),
                    }
                }
            }
        };

        Self {
            backend,
            config: Some(Arc::new(config.clone())),
        }
    }

    pub fn unavailable(reason: &str) -> Self {
        Self {
            backend: LlmBackend::Unavailable {
                reason: reason.to_string(),
            },
            config: None,
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.backend, LlmBackend::Unavailable { .. })
    }

    pub fn backend(&self) -> &LlmBackend {
        &self.backend
    }

    pub fn config(&self) -> Option<&LlmConfig> {
        self.config.as_deref()
    }

    pub fn model_name(&self) -> Option<&str> {
        self.config().map(|config| config.model.as_str())
    }

    /// Send one transcript to the configured model under `system_prompt`.
    pub async fn complete(&self, system_prompt: &str, transcript: &str) -> Result<String> {
        if !self.is_available() {
            return Err(ChatlensError::LlmUnavailable(self.unavailable_reason()));
        }

        let config = self
            .config()
            .ok_or_else(|| ChatlensError::LlmUnavailable("No config available".to_string()))?;

        LlmApiClient::new(config)?
            .summarize(system_prompt, transcript)
            .await
    }

    fn unavailable_reason(&self) -> String {
        match &self.backend {
            LlmBackend::Unavailable { reason } => reason.clone(),
            _ => "LLM backend is available".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(model: &str, base_url: Option<&str>) -> LlmConfig {
        LlmConfig {
            model: model.to_string(),
            api_key: Some("sk-test".to_string()),
            base_url: base_url.map(str::to_string),
            timeout_secs: 5,
            max_retries: 0,
            temperature: Some(0.3),
        }
    }

    #[test]
    fn test_backend_from_model_prefix() {
        assert_eq!(
            LlmProvider::new(Some(&config("openai/gpt-4o-mini", None))).backend(),
            &LlmBackend::OpenAI
        );
        assert_eq!(
            LlmProvider::new(Some(&config("ollama/llama3", None))).backend(),
            &LlmBackend::Ollama
        );
        assert_eq!(
            LlmProvider::new(Some(&config("openrouter/anthropic/x", None))).backend(),
            &LlmBackend::OpenRouter
        );
    }

    #[test]
    fn test_unknown_provider_needs_base_url() {
        let provider = LlmProvider::new(Some(&config("acme/model", None)));
        assert!(!provider.is_available());

        let provider = LlmProvider::new(Some(&config("acme/model", Some("http://x/v1"))));
        assert!(provider.is_available());
    }

    #[test]
    fn test_model_name_keeps_provider_prefix() {
        let provider = LlmProvider::new(Some(&config("openai/gpt-4o-mini", None)));
        assert_eq!(provider.model_name(), Some("openai/gpt-4o-mini"));
        assert_eq!(provider.config().and_then(|c| c.temperature), Some(0.3));
    }

    #[tokio::test]
    async fn test_unconfigured_provider_refuses() {
        let provider = LlmProvider::new(None);
        let err = provider.complete("be brief", "Ana: hi").await.unwrap_err();
        assert!(matches!(err, ChatlensError::LlmUnavailable(_)));
    }
}
