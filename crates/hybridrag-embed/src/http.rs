//! Clients for OpenAI-compatible embedding and chat-completion endpoints.
//!
//! HTTP 429 maps to `RateLimited` (with the `retry-after` hint in
//! milliseconds), request timeouts to `Timeout` and 400 to `InvalidInput`.
//! The API key comes from the argument or `OPENAI_API_KEY`.
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use hybridrag_core::config::{EmbeddingConfig, ExpansionConfig};
use hybridrag_core::error::{Error, Result};
use hybridrag_core::traits::{CompletionProvider, EmbeddingProvider};

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatContent,
}

#[derive(Debug, Deserialize)]
struct ChatContent {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

fn build_client(endpoint: &str, api_key: Option<String>, timeout_secs: u64) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    match api_key.or_else(|| std::env::var("OPENAI_API_KEY").ok()) {
        Some(key) => {
            let value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| Error::InvalidConfig(format!("Invalid API key format: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }
        None if endpoint.contains("openai.com") => warn!("No API key provided for {}", endpoint),
        None => {}
    }
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .default_headers(headers)
        .build()
        .map_err(|e| Error::InvalidConfig(format!("Failed to build HTTP client: {e}")))
}

fn send_error(endpoint: &str, e: &reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(endpoint.to_string())
    } else {
        Error::Provider(format!("HTTP request failed: {e}"))
    }
}

/// Map a non-success response onto the provider error kinds.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_ms = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(|s| s * 1000);
        return Err(Error::RateLimited { retry_after_ms });
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body).map(|r| r.error.message).unwrap_or(body);
    match status {
        StatusCode::BAD_REQUEST => Err(Error::InvalidInput(message)),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => Err(Error::Timeout(message)),
        _ => Err(Error::Provider(format!("API error ({status}): {message}"))),
    }
}

pub struct HttpEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimension: usize,
    max_input_chars: usize,
}

impl HttpEmbedder {
    pub fn new(cfg: &EmbeddingConfig, api_key: Option<String>) -> Result<Self> {
        info!("Initializing HTTP embedder: endpoint={}, model={}", cfg.endpoint, cfg.model);
        Ok(Self {
            client: build_client(&cfg.endpoint, api_key, cfg.timeout_secs)?,
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
            dimension: cfg.dimension,
            max_input_chars: cfg.max_input_chars,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbedder {
    fn dim(&self) -> usize {
        self.dimension
    }

    fn max_input_chars(&self) -> usize {
        self.max_input_chars
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Embedding {} chars via {}", text.chars().count(), self.endpoint);
        let request = EmbeddingRequest { model: &self.model, input: text };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| send_error(&self.endpoint, &e))?;
        let parsed: EmbeddingResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| Error::Provider(format!("Failed to parse embedding response: {e}")))?;
        let vector = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| Error::Provider("No embedding returned".to_string()))?;
        if vector.len() != self.dimension {
            return Err(Error::Provider(format!("Expected {} dimensions, got {}", self.dimension, vector.len())));
        }
        Ok(vector)
    }
}

pub struct HttpCompleter {
    client: Client,
    endpoint: String,
    model: String,
}

impl HttpCompleter {
    pub fn new(cfg: &ExpansionConfig, api_key: Option<String>, timeout_secs: u64) -> Result<Self> {
        info!("Initializing HTTP completer: endpoint={}, model={}", cfg.endpoint, cfg.model);
        Ok(Self {
            client: build_client(&cfg.endpoint, api_key, timeout_secs)?,
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
        })
    }
}

#[async_trait]
impl CompletionProvider for HttpCompleter {
    async fn complete(&self, prompt: &str, temperature: f32, max_tokens: u32) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            temperature,
            max_tokens,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| send_error(&self.endpoint, &e))?;
        let parsed: ChatResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| Error::Provider(format!("Failed to parse completion response: {e}")))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::Provider("No completion returned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_shape() {
        let request = ChatRequest {
            model: "gpt-3.5-turbo",
            messages: vec![ChatMessage { role: "user", content: "hi" }],
            temperature: 0.3,
            max_tokens: 100,
        };
        let json = serde_json::to_value(&request).expect("serialize");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["max_tokens"], 100);
    }

    #[test]
    fn parses_embedding_and_error_bodies() {
        let ok: EmbeddingResponse = serde_json::from_str(r#"{"data":[{"embedding":[0.1,0.2],"index":0}],"usage":{}}"#).expect("parse");
        assert_eq!(ok.data[0].embedding, vec![0.1, 0.2]);
        let err: ErrorResponse = serde_json::from_str(r#"{"error":{"message":"too long","type":"invalid_request_error"}}"#).expect("parse");
        assert_eq!(err.error.message, "too long");
    }

    #[test]
    fn builds_client_without_key_for_local_endpoints() {
        assert!(build_client("http://localhost:8080/v1/embeddings", None, 5).is_ok());
    }
}
