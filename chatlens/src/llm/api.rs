use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    error::{ApiError, OpenAIError},
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
    },
    Client,
};
use reqwest::StatusCode;

use crate::config::{default_base_url, parse_llm_provider_model, LlmConfig};
use crate::error::{ChatlensError, Result};

const RATE_LIMIT_MARKERS: &[&str] = &[
    "rate limit",
    "rate_limit",
    "too many requests",
    "insufficient_quota",
];

const AUTH_MARKERS: &[&str] = &[
    "unauthorized",
    "forbidden",
    "authentication",
    "invalid api key",
    "invalid_api_key",
];

/// How a failed completion should be handled.
#[derive(Debug)]
enum Failure {
    RateLimited,
    Auth(String),
    Transient(String),
    Fatal(ChatlensError),
}

/// Chat-completions client used to summarize one transcript at a time.
///
/// Each call sends the analyst system prompt and the transcript as the only
/// user message. Rate limits and authentication failures are returned at
/// once; server errors and dropped connections are retried up to
/// `max_retries` times.
#[derive(Clone)]
pub struct LlmApiClient {
    client: Client<OpenAIConfig>,
    model: String,
    base_url: String,
    temperature: Option<f32>,
    max_retries: u32,
}

impl LlmApiClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let (provider, model) = parse_llm_provider_model(&config.model);
        let provider = provider.to_lowercase();

        let runs_locally = matches!(provider.as_str(), "ollama" | "local" | "lmstudio");
        if !runs_locally && config.api_key.is_none() {
            return Err(ChatlensError::Llm(format!(
                "API key required for provider {provider}"
            )));
        }

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| default_base_url(&provider).to_string());
        let model = if provider == "local" {
            config.model.clone()
        } else {
            model.to_string()
        };

        let openai_config = OpenAIConfig::new()
            .with_api_base(base_url.clone())
            .with_api_key(config.api_key.clone().unwrap_or_default());

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChatlensError::Llm(format!("Failed to create LLM HTTP client: {e}")))?;

        // async-openai retries 5xx on its own; keep that inside one timeout.
        let backoff = backoff::ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(config.timeout_secs)),
            ..Default::default()
        };

        Ok(Self {
            client: Client::with_config(openai_config)
                .with_http_client(http_client)
                .with_backoff(backoff),
            model,
            base_url,
            temperature: config.temperature,
            max_retries: config.max_retries,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send `transcript` under `system_prompt` and return the reply text.
    pub async fn summarize(&self, system_prompt: &str, transcript: &str) -> Result<String> {
        if transcript.trim().is_empty() {
            return Err(ChatlensError::Validation(
                "Transcript cannot be empty".to_string(),
            ));
        }

        let mut attempt = 0;
        loop {
            let request = self.request(system_prompt, transcript)?;
            let error = match self.client.chat().create(request).await {
                Ok(response) => return reply_text(response),
                Err(error) => error,
            };

            match classify(error) {
                Failure::RateLimited => {
                    return Err(ChatlensError::LlmRateLimit { retry_after: None })
                }
                Failure::Auth(detail) => {
                    return Err(ChatlensError::Llm(format!(
                        "LLM authentication failed: {detail}"
                    )))
                }
                Failure::Fatal(error) => return Err(error),
                Failure::Transient(detail) if attempt >= self.max_retries => {
                    return Err(ChatlensError::Llm(detail))
                }
                Failure::Transient(detail) => {
                    attempt += 1;
                    let delay = Duration::from_millis(100 * 2_u64.pow(attempt - 1));
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        model = %self.model,
                        %detail,
                        "Retrying summarizer call"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    fn request(
        &self,
        system_prompt: &str,
        transcript: &str,
    ) -> Result<CreateChatCompletionRequest> {
        let invalid =
            |e: OpenAIError| ChatlensError::Validation(format!("Invalid LLM request: {e}"));

        let system = ChatCompletionRequestSystemMessageArgs::default()
            .content(system_prompt)
            .build()
            .map_err(invalid)?;
        let user = ChatCompletionRequestUserMessageArgs::default()
            .content(transcript)
            .build()
            .map_err(invalid)?;

        let messages: Vec<ChatCompletionRequestMessage> = vec![system.into(), user.into()];

        let mut request = CreateChatCompletionRequestArgs::default();
        request.model(self.model.clone()).messages(messages);
        if let Some(temperature) = self.temperature {
            request.temperature(temperature);
        }

        request.build().map_err(invalid)
    }
}

fn reply_text(response: CreateChatCompletionResponse) -> Result<String> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_default();

    if content.trim().is_empty() {
        return Err(ChatlensError::Llm(
            "LLM reply contained no content".to_string(),
        ));
    }
    Ok(content)
}

fn classify(error: OpenAIError) -> Failure {
    match error {
        OpenAIError::ApiError(api_error) => classify_api_error(api_error),
        OpenAIError::Reqwest(e) => match e.status() {
            Some(StatusCode::TOO_MANY_REQUESTS) => Failure::RateLimited,
            Some(StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => Failure::Auth(e.to_string()),
            Some(status) if !status.is_server_error() => {
                Failure::Fatal(ChatlensError::Llm(format!("LLM request failed: {e}")))
            }
            _ => Failure::Transient(format!("LLM request failed: {e}")),
        },
        OpenAIError::JSONDeserialize(e) => {
            Failure::Fatal(ChatlensError::Llm(format!("Failed to parse LLM response: {e}")))
        }
        OpenAIError::InvalidArgument(message) => Failure::Fatal(ChatlensError::Validation(message)),
        other => Failure::Fatal(ChatlensError::Llm(other.to_string())),
    }
}

/// Providers disagree on where they put the reason, so message, type and
/// code are searched together. An error with neither type nor code is
/// treated as a passing upstream fault.
fn classify_api_error(api_error: ApiError) -> Failure {
    let haystack = format!(
        "{} {} {}",
        api_error.message,
        api_error.r#type.as_deref().unwrap_or_default(),
        api_error.code.as_deref().unwrap_or_default()
    )
    .to_lowercase();

    if RATE_LIMIT_MARKERS.iter().any(|m| haystack.contains(m)) {
        Failure::RateLimited
    } else if AUTH_MARKERS.iter().any(|m| haystack.contains(m)) {
        Failure::Auth(api_error.to_string())
    } else if api_error.r#type.is_none() && api_error.code.is_none() {
        Failure::Transient(format!("LLM API error: {api_error}"))
    } else {
        Failure::Fatal(ChatlensError::Llm(format!("LLM API error: {api_error}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(model: &str) -> LlmConfig {
        LlmConfig {
            model: model.to_string(),
            api_key: None,
            base_url: None,
            timeout_secs: 30,
            max_retries: 0,
            temperature: Some(0.3),
        }
    }

    fn api_error(message: &str, error_type: Option<&str>, code: Option<&str>) -> ApiError {
        serde_json::from_value(serde_json::json!({
            "message": message,
            "type": error_type,
            "param": null,
            "code": code,
        }))
        .expect("valid api error")
    }

    #[test]
    fn local_servers_need_no_api_key() {
        let client = LlmApiClient::new(&config("ollama/llama3")).unwrap();
        assert_eq!(client.model(), "llama3");
        assert_eq!(client.base_url(), "http://localhost:11434/v1");
    }

    #[test]
    fn hosted_provider_requires_api_key() {
        let err = LlmApiClient::new(&config("openai/gpt-4o-mini")).err();
        assert!(matches!(err, Some(ChatlensError::Llm(_))));
    }

    #[test]
    fn explicit_base_url_wins() {
        let mut config = config("lmstudio/qwen2.5");
        config.base_url = Some("http://127.0.0.1:9999/v1".to_string());
        let client = LlmApiClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:9999/v1");
    }

    #[test]
    fn request_is_system_prompt_then_transcript() {
        let client = LlmApiClient::new(&config("ollama/llama3")).unwrap();
        let request = client
            .request("be precise", "Ana: hi")
            .expect("request should build");

        assert_eq!(request.model, "llama3");
        assert_eq!(request.messages.len(), 2);
        assert!(matches!(
            request.messages[0],
            ChatCompletionRequestMessage::System(_)
        ));
        assert!(matches!(
            request.messages[1],
            ChatCompletionRequestMessage::User(_)
        ));
        assert_eq!(request.temperature, Some(0.3));
    }

    #[test]
    fn temperature_is_omitted_when_unset() {
        let mut config = config("ollama/llama3");
        config.temperature = None;
        let client = LlmApiClient::new(&config).unwrap();
        let request = client.request("be precise", "Ana: hi").unwrap();
        assert!(request.temperature.is_none());
    }

    #[tokio::test]
    async fn blank_transcript_is_rejected_without_a_call() {
        let client = LlmApiClient::new(&config("ollama/llama3")).unwrap();
        let err = client.summarize("be precise", "  \n ").await.unwrap_err();
        assert!(matches!(err, ChatlensError::Validation(_)));
    }

    #[test]
    fn api_errors_are_classified() {
        let rate_limited = api_error(
            "Rate limit reached for requests",
            Some("requests"),
            Some("rate_limit_exceeded"),
        );
        assert!(matches!(classify_api_error(rate_limited), Failure::RateLimited));

        let bad_key = api_error(
            "Incorrect API key provided",
            Some("invalid_request_error"),
            Some("invalid_api_key"),
        );
        assert!(matches!(classify_api_error(bad_key), Failure::Auth(_)));

        let hiccup = api_error("upstream hiccup", None, None);
        assert!(matches!(classify_api_error(hiccup), Failure::Transient(_)));

        let rejected = api_error("context too long", Some("invalid_request_error"), None);
        assert!(matches!(
            classify_api_error(rejected),
            Failure::Fatal(ChatlensError::Llm(_))
        ));
    }

    #[test]
    fn invalid_argument_is_a_validation_error() {
        let failure = classify(OpenAIError::InvalidArgument("bad".to_string()));
        assert!(matches!(failure, Failure::Fatal(ChatlensError::Validation(_))));
    }
}
