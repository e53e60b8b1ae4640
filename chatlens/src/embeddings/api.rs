use std::time::Duration;

use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Response, StatusCode,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::config::EmbeddingApiFormat;
use crate::error::{ChatlensError, Result};

/// Where Ollama serves its own API when `EMBEDDING_BASE_URL` is not set.
pub const OLLAMA_NATIVE_BASE_URL: &str = "http://localhost:11434";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub format: EmbeddingApiFormat,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Serialize)]
struct BatchRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct BatchReply {
    data: Vec<BatchVector>,
}

#[derive(Deserialize)]
struct BatchVector {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct OllamaReply {
    embedding: Vec<f32>,
}

/// Result of one HTTP round trip.
enum Attempt<T> {
    Done(T),
    Retry(ChatlensError),
    Fail(ChatlensError),
}

/// HTTP client for summary embeddings, speaking either the OpenAI batch
/// format or Ollama's native single-text format.
///
/// 429, 5xx and transport failures are retried with exponential delay.
/// 401/403 and other client errors fail at once.
#[derive(Clone)]
pub struct EmbeddingApiClient {
    client: Client,
    headers: HeaderMap,
    config: ApiConfig,
}

impl EmbeddingApiClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChatlensError::Embedding(format!("Failed to create HTTP client: {e}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(api_key) = &config.api_key {
            let bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| ChatlensError::Embedding(format!("Invalid API key header: {e}")))?;
            headers.insert(AUTHORIZATION, bearer);
        }

        Ok(Self {
            client,
            headers,
            config,
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub fn format(&self) -> EmbeddingApiFormat {
        self.config.format
    }

    /// One vector per input text, in input order.
    pub async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        match self.config.format {
            EmbeddingApiFormat::OpenAi => {
                let request = BatchRequest {
                    model: &self.config.model,
                    input: texts,
                };
                let reply: BatchReply = self.post("embeddings", &request).await?;
                Ok(reply.data.into_iter().map(|v| v.embedding).collect())
            }
            EmbeddingApiFormat::Ollama => {
                let mut vectors = Vec::with_capacity(texts.len());
                for text in texts {
                    let request = OllamaRequest {
                        model: &self.config.model,
                        input: text,
                    };
                    let reply: OllamaReply = self.post("api/embeddings", &request).await?;
                    if reply.embedding.is_empty() {
                        return Err(ChatlensError::Embedding(format!(
                            "Ollama returned an empty embedding for model {}",
                            self.config.model
                        )));
                    }
                    vectors.push(reply.embedding);
                }
                Ok(vectors)
            }
        }
    }

    /// Embed a sample string and report the vector length the server returns.
    pub async fn detect_dimensions(&self) -> Result<usize> {
        self.embed(&["dimension check"])
            .await?
            .first()
            .map(Vec::len)
            .ok_or_else(|| ChatlensError::Embedding("No embedding returned".to_string()))
    }

    async fn post<B, R>(&self, endpoint: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/{endpoint}", self.config.base_url.trim_end_matches('/'));

        let mut attempt = 0;
        loop {
            let outcome = match self
                .client
                .post(&url)
                .headers(self.headers.clone())
                .json(body)
                .send()
                .await
            {
                Ok(response) => read_reply(response).await,
                Err(e) => Attempt::Retry(ChatlensError::Embedding(format!("Request failed: {e}"))),
            };

            match outcome {
                Attempt::Done(reply) => return Ok(reply),
                Attempt::Fail(error) => return Err(error),
                Attempt::Retry(error) if attempt >= self.config.max_retries => return Err(error),
                Attempt::Retry(error) => {
                    attempt += 1;
                    let delay = Duration::from_millis(100 * 2_u64.pow(attempt - 1));
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        %error,
                        %url,
                        "Retrying embedding request"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

async fn read_reply<R: DeserializeOwned>(response: Response) -> Attempt<R> {
    let status = response.status();

    if status.is_success() {
        return match response.json::<R>().await {
            Ok(reply) => Attempt::Done(reply),
            Err(e) => Attempt::Fail(ChatlensError::Embedding(format!(
                "Failed to parse response: {e}"
            ))),
        };
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok());
        return Attempt::Retry(ChatlensError::ApiRateLimit { retry_after });
    }

    let body = response.text().await.unwrap_or_default();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Attempt::Fail(ChatlensError::ApiAuth(body))
        }
        status if status.is_server_error() => Attempt::Retry(ChatlensError::Embedding(format!(
            "Server error {status}: {body}"
        ))),
        status => Attempt::Fail(ChatlensError::Embedding(format!(
            "API error {status}: {body}"
        ))),
    }
}
