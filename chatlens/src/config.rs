use serde::Deserialize;
use std::env;

use crate::segmentation::gap_from_minutes;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

fn parse_env_opt<T: std::str::FromStr>(var: &str) -> Option<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Ignoring.", val, var, e);
                None
            }
        },
        Err(_) => None,
    }
}

/// `SESSION_GAP_MINUTES`, falling back when the value cannot be used as a gap.
fn parse_gap_minutes(default: i64) -> i64 {
    let gap_minutes = parse_env_or("SESSION_GAP_MINUTES", default);
    match gap_from_minutes(gap_minutes) {
        Ok(_) => gap_minutes,
        Err(e) => {
            tracing::warn!("{}. Using default.", e);
            default
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub embeddings: EmbeddingsConfig,
    pub analysis: AnalysisConfig,
    pub clustering: ClusteringConfig,
    pub llm: Option<LlmConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingsConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub dimensions: usize,
    pub batch_size: usize,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub api_format: EmbeddingApiFormat,
}

/// Request and reply shape spoken by an HTTP embedding server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingApiFormat {
    /// `POST {base}/embeddings` taking a batch, answered with `data[].embedding`.
    #[default]
    OpenAi,
    /// Ollama's own `POST {base}/api/embeddings`, one text per request,
    /// answered with a single `embedding`.
    Ollama,
}

impl std::str::FromStr for EmbeddingApiFormat {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(format!("expected `openai` or `ollama`, got `{other}`")),
        }
    }
}

/// LLM configuration for the session summarizer
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub temperature: Option<f32>,
}

/// Knobs for splitting a transcript into sessions and summarizing them.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Maximum silence tolerated inside one session.
    pub gap_minutes: i64,
    /// Summarizer calls allowed in flight at once.
    pub concurrency: usize,
    /// Transcripts longer than this are never sent to the summarizer.
    pub max_transcript_chars: usize,
    /// Transcripts shorter than this are treated as trivial.
    pub min_transcript_chars: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClusteringConfig {
    pub similarity_threshold: f32,
    pub embed_concurrency: usize,
    pub label_chars: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            gap_minutes: 240,
            concurrency: 8,
            max_transcript_chars: 50_000,
            min_transcript_chars: 20,
        }
    }
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.8,
            embed_concurrency: 4,
            label_chars: 40,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let analysis_defaults = AnalysisConfig::default();
        let clustering_defaults = ClusteringConfig::default();

        Self {
            server: ServerConfig {
                host: env::var("CHATLENS_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("CHATLENS_PORT", 3001),
                max_body_bytes: parse_env_or("CHATLENS_MAX_BODY_BYTES", 10 * 1024 * 1024),
            },
            embeddings: EmbeddingsConfig {
                model: env::var("EMBEDDING_MODEL")
                    .unwrap_or_else(|_| "BAAI/bge-small-en-v1.5".to_string()),
                api_key: env::var("EMBEDDING_API_KEY").ok(),
                base_url: env::var("EMBEDDING_BASE_URL").ok(),
                dimensions: parse_env_or("EMBEDDING_DIMENSIONS", 384),
                batch_size: parse_env_or("EMBEDDING_BATCH_SIZE", 32),
                timeout_secs: parse_env_or("EMBEDDING_TIMEOUT", 30),
                max_retries: parse_env_or("EMBEDDING_MAX_RETRIES", 3),
                api_format: parse_env_or("EMBEDDING_API_FORMAT", EmbeddingApiFormat::default()),
            },
            analysis: AnalysisConfig {
                gap_minutes: parse_gap_minutes(analysis_defaults.gap_minutes),
                concurrency: parse_env_or("ANALYSIS_CONCURRENCY", analysis_defaults.concurrency),
                max_transcript_chars: parse_env_or(
                    "ANALYSIS_MAX_TRANSCRIPT_CHARS",
                    analysis_defaults.max_transcript_chars,
                ),
                min_transcript_chars: parse_env_or(
                    "ANALYSIS_MIN_TRANSCRIPT_CHARS",
                    analysis_defaults.min_transcript_chars,
                ),
            },
            clustering: ClusteringConfig {
                similarity_threshold: parse_env_or(
                    "CLUSTER_SIMILARITY_THRESHOLD",
                    clustering_defaults.similarity_threshold,
                ),
                embed_concurrency: parse_env_or(
                    "CLUSTER_EMBED_CONCURRENCY",
                    clustering_defaults.embed_concurrency,
                ),
                label_chars: parse_env_or("CLUSTER_LABEL_CHARS", clustering_defaults.label_chars),
            },
            llm: env::var("LLM_MODEL").ok().map(|model| LlmConfig {
                model,
                api_key: env::var("LLM_API_KEY")
                    .or_else(|_| env::var("OPENAI_API_KEY"))
                    .ok(),
                base_url: env::var("LLM_BASE_URL").ok(),
                timeout_secs: parse_env_or("LLM_TIMEOUT", 60),
                max_retries: parse_env_or("LLM_MAX_RETRIES", 2),
                temperature: parse_env_opt("LLM_TEMPERATURE").or(Some(0.3)),
            }),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}

/// OpenAI-compatible endpoint of a known provider, used when no base URL is set.
pub fn default_base_url(provider: &str) -> &'static str {
    match provider.to_lowercase().as_str() {
        "openrouter" => "https://openrouter.ai/api/v1",
        "ollama" => "http://localhost:11434/v1",
        "lmstudio" => "http://localhost:1234/v1",
        _ => "https://api.openai.com/v1",
    }
}

/// Known embedding providers that use OpenAI-compatible APIs
const KNOWN_PROVIDERS: &[&str] = &["openai", "openrouter", "ollama", "lmstudio", "local"];

/// Known LLM providers that use OpenAI-compatible APIs
pub const KNOWN_LLM_PROVIDERS: &[&str] = &["openai", "openrouter", "ollama", "lmstudio"];

/// Parse a model name into (provider, model) tuple.
pub fn parse_provider_model(model: &str) -> (&str, &str) {
    if let Some((prefix, rest)) = model.split_once('/') {
        // Check if prefix is a known provider
        let prefix_lower = prefix.to_lowercase();
        if KNOWN_PROVIDERS.contains(&prefix_lower.as_str()) {
            return (prefix, rest);
        }
    }
    // Default to local provider
    ("local", model)
}

/// Parse an LLM model name into (provider, model) tuple.
pub fn parse_llm_provider_model(model: &str) -> (&str, &str) {
    if let Some((prefix, rest)) = model.split_once('/') {
        let prefix_lower = prefix.to_lowercase();
        if KNOWN_LLM_PROVIDERS.contains(&prefix_lower.as_str()) {
            return (prefix, rest);
        }
    }
    // Default to treating the whole string as a local model
    ("local", model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_analysis_config_defaults() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();

        std::env::remove_var("SESSION_GAP_MINUTES");
        std::env::remove_var("ANALYSIS_CONCURRENCY");

        let config = Config::default();
        assert_eq!(config.analysis.gap_minutes, 240);
        assert_eq!(config.analysis.concurrency, 8);
        assert_eq!(config.analysis.max_transcript_chars, 50_000);
        assert_eq!(config.analysis.min_transcript_chars, 20);
    }

    #[test]
    fn test_analysis_config_from_env() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();

        std::env::set_var("SESSION_GAP_MINUTES", "60");
        std::env::set_var("ANALYSIS_CONCURRENCY", "3");

        let config = Config::default();
        assert_eq!(config.analysis.gap_minutes, 60);
        assert_eq!(config.analysis.concurrency, 3);

        std::env::remove_var("SESSION_GAP_MINUTES");
        std::env::remove_var("ANALYSIS_CONCURRENCY");
    }

    #[test]
    fn test_unusable_gap_falls_back_to_default() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();

        for value in ["0", "-30", "9223372036854775807"] {
            std::env::set_var("SESSION_GAP_MINUTES", value);
            assert_eq!(Config::default().analysis.gap_minutes, 240, "{value}");
        }

        std::env::remove_var("SESSION_GAP_MINUTES");
    }

    #[test]
    fn test_invalid_value_falls_back_to_default() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();

        std::env::set_var("CLUSTER_SIMILARITY_THRESHOLD", "very-similar");
        let config = Config::default();
        assert_eq!(config.clustering.similarity_threshold, 0.8);
        std::env::remove_var("CLUSTER_SIMILARITY_THRESHOLD");
    }

    #[test]
    fn test_llm_config_absent_without_model() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();

        std::env::remove_var("LLM_MODEL");
        let config = Config::default();
        assert!(config.llm.is_none());

        std::env::set_var("LLM_MODEL", "openai/gpt-4o-mini");
        std::env::remove_var("LLM_TEMPERATURE");
        let config = Config::default();
        let llm = config.llm.expect("llm config should be present");
        assert_eq!(llm.model, "openai/gpt-4o-mini");
        assert_eq!(llm.temperature, Some(0.3));

        std::env::remove_var("LLM_MODEL");
    }

    #[test]
    fn test_llm_api_key_falls_back_to_openai_key() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();

        std::env::set_var("LLM_MODEL", "openai/gpt-4o-mini");
        std::env::remove_var("LLM_API_KEY");
        std::env::set_var("OPENAI_API_KEY", "sk-from-openai-var");

        let config = Config::default();
        assert_eq!(
            config.llm.and_then(|llm| llm.api_key).as_deref(),
            Some("sk-from-openai-var")
        );

        std::env::remove_var("LLM_MODEL");
        std::env::remove_var("OPENAI_API_KEY");
    }

    #[test]
    fn test_parse_provider_model() {
        assert_eq!(
            parse_provider_model("ollama/mxbai-embed-large"),
            ("ollama", "mxbai-embed-large")
        );
        assert_eq!(
            parse_provider_model("BAAI/bge-small-en-v1.5"),
            ("local", "BAAI/bge-small-en-v1.5")
        );
        assert_eq!(
            parse_llm_provider_model("openrouter/openai/gpt-4o"),
            ("openrouter", "openai/gpt-4o")
        );
    }

    #[test]
    fn test_embedding_api_format_from_env() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();

        std::env::remove_var("EMBEDDING_API_FORMAT");
        assert_eq!(
            Config::default().embeddings.api_format,
            EmbeddingApiFormat::OpenAi
        );

        std::env::set_var("EMBEDDING_API_FORMAT", "Ollama");
        assert_eq!(
            Config::default().embeddings.api_format,
            EmbeddingApiFormat::Ollama
        );

        std::env::set_var("EMBEDDING_API_FORMAT", "grpc");
        assert_eq!(
            Config::default().embeddings.api_format,
            EmbeddingApiFormat::OpenAi
        );

        std::env::remove_var("EMBEDDING_API_FORMAT");
    }

    #[test]
    fn test_parse_env_or_valid_value() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        std::env::set_var("__TEST_PARSE_PORT", "8080");
        let result: u16 = parse_env_or("__TEST_PARSE_PORT", 3000);
        assert_eq!(result, 8080);
        std::env::remove_var("__TEST_PARSE_PORT");
    }
}
