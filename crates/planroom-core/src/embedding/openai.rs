//! OpenAI-compatible HTTP providers.
//!
//! Works against the hosted OpenAI API and against local servers that
//! expose the same `/embeddings` and `/chat/completions` routes.

use super::traits::{ImageDescriber, TextEmbedder};
use crate::config::{EMBEDDING_BATCH_SIZE, VECTOR_DIMENSION};
use crate::error::EmbeddingError;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Connection settings shared by both providers.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Base URL, e.g. `https://api.openai.com/v1`
    pub base_url: String,
    /// Bearer token; local servers usually need none
    pub api_key: Option<String>,
    /// Embedding model name
    pub model: String,
    /// Vision-capable chat model for image descriptions
    pub vision_model: String,
    /// Requested embedding dimension
    pub dimensions: usize,
    pub timeout: Duration,
    /// Total attempts per request, including the first
    pub max_retries: usize,
    /// Maximum inputs per embeddings request
    pub batch_size: usize,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "text-embedding-3-small".to_string(),
            vision_model: "gpt-4o-mini".to_string(),
            dimensions: VECTOR_DIMENSION,
            timeout: Duration::from_secs(60),
            max_retries: 4,
            batch_size: EMBEDDING_BATCH_SIZE,
        }
    }
}

/// JSON-over-HTTP client with retry on 429 and 5xx.
#[derive(Clone)]
struct JsonClient {
    client: Client,
    max_retries: usize,
}

impl JsonClient {
    fn new(config: &OpenAiConfig) -> Result<Self, EmbeddingError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = config.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            let auth = format!("Bearer {}", key.trim());
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth)
                    .map_err(|_| EmbeddingError::InvalidConfig("invalid API key".to_string()))?,
            );
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| EmbeddingError::InvalidConfig(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_retries: config.max_retries.max(1),
        })
    }

    async fn post<B, R>(&self, url: &str, body: &B) -> Result<R, EmbeddingError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let mut attempt = 0usize;
        loop {
            match self.client.post(url).json(body).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return resp
                            .json::<R>()
                            .await
                            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()));
                    }

                    let text = resp
                        .text()
                        .await
                        .unwrap_or_else(|_| "<body unavailable>".to_string());
                    if should_retry(status) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        warn!("{} returned {}, retrying (attempt {})", url, status, attempt);
                        tokio::time::sleep(retry_backoff(attempt)).await;
                        continue;
                    }
                    return Err(EmbeddingError::RequestFailed(format!(
                        "{} ({}): {}",
                        url, status, text
                    )));
                }
                Err(err) => {
                    if is_retryable_error(&err) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        warn!("{} failed: {}, retrying (attempt {})", url, err, attempt);
                        tokio::time::sleep(retry_backoff(attempt)).await;
                        continue;
                    }
                    return Err(EmbeddingError::RequestFailed(err.to_string()));
                }
            }
        }
    }
}

fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

fn retry_backoff(attempt: usize) -> Duration {
    let capped = attempt.min(5) as u32;
    Duration::from_millis(500 * (1 << capped))
}

/// Embeddings client for OpenAI-compatible endpoints.
#[derive(Clone)]
pub struct OpenAiEmbedder {
    http: JsonClient,
    endpoint: String,
    model: String,
    dimensions: usize,
    batch_size: usize,
}

impl OpenAiEmbedder {
    pub fn new(config: &OpenAiConfig) -> Result<Self, EmbeddingError> {
        if config.model.trim().is_empty() {
            return Err(EmbeddingError::InvalidConfig(
                "missing embedding model name".to_string(),
            ));
        }
        if config.dimensions == 0 {
            return Err(EmbeddingError::InvalidConfig(
                "embedding dimension must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            http: JsonClient::new(config)?,
            endpoint: format!("{}/embeddings", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            dimensions: config.dimensions,
            batch_size: config.batch_size.max(1),
        })
    }

    async fn request(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: inputs,
            dimensions: Some(self.dimensions),
        };
        let mut parsed: EmbeddingResponse = self.http.post(&self.endpoint, &request).await?;
        parsed.data.sort_by_key(|entry| entry.index);

        if parsed.data.len() != inputs.len() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "{} embeddings for {} inputs",
                parsed.data.len(),
                inputs.len()
            )));
        }
        parsed
            .data
            .into_iter()
            .map(|entry| {
                if entry.embedding.len() != self.dimensions {
                    return Err(EmbeddingError::DimensionMismatch {
                        expected: self.dimensions,
                        actual: entry.embedding.len(),
                    });
                }
                Ok(entry.embedding)
            })
            .collect()
    }
}

#[async_trait]
impl TextEmbedder for OpenAiEmbedder {
    fn dimension(&self) -> usize {
        self.dimensions
    }

    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.request(&[text])
            .await?
            .pop()
            .ok_or_else(|| EmbeddingError::InvalidResponse("empty embedding list".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let inputs: Vec<&str> = batch.iter().map(String::as_str).collect();
            debug!("Embedding batch of {}", inputs.len());
            embeddings.extend(self.request(&inputs).await?);
        }
        Ok(embeddings)
    }
}

/// Image describer backed by a vision-capable chat completions endpoint.
#[derive(Clone)]
pub struct OpenAiImageDescriber {
    http: JsonClient,
    endpoint: String,
    model: String,
}

const DESCRIBE_PROMPT: &str = "Describe this image from a construction document. \
Name the drawing type, visible labels, dimensions, room or door numbers and any \
schedule content. Be concise and factual.";

impl OpenAiImageDescriber {
    pub fn new(config: &OpenAiConfig) -> Result<Self, EmbeddingError> {
        if config.vision_model.trim().is_empty() {
            return Err(EmbeddingError::InvalidConfig(
                "missing vision model name".to_string(),
            ));
        }
        Ok(Self {
            http: JsonClient::new(config)?,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.vision_model.clone(),
        })
    }
}

#[async_trait]
impl ImageDescriber for OpenAiImageDescriber {
    async fn try_describe(
        &self,
        image: &[u8],
        context_hint: &str,
    ) -> Result<String, EmbeddingError> {
        let data_url = format!("data:{};base64,{}", sniff_mime(image), BASE64.encode(image));
        let prompt = if context_hint.is_empty() {
            DESCRIBE_PROMPT.to_string()
        } else {
            format!("{} Context: {}", DESCRIBE_PROMPT, context_hint)
        };

        let request = ChatRequest {
            model: &self.model,
            max_tokens: 500,
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::Text { text: prompt },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url: data_url },
                    },
                ],
            }],
        };

        let response: ChatResponse = self.http.post(&self.endpoint, &request).await?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| EmbeddingError::InvalidResponse("no choices returned".to_string()))
    }
}

fn sniff_mime(bytes: &[u8]) -> &'static str {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [0xFF, 0xD8, ..] => "image/jpeg",
        [b'G', b'I', b'F', ..] => "image/gif",
        _ => "application/octet-stream",
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    #[serde(borrow)]
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: Vec<ContentPart>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}
