//! Remote embeddings over an OpenAI-compatible `/embeddings` endpoint.
//!
//! Works with OpenAI, Ollama (`/v1`), vLLM and similar servers. The declared
//! dimension is checked against every response so a model swap on the server
//! side surfaces as an error instead of corrupting the index.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use super::engine::{check_input, Embedder, Embedding, EmbeddingError, Result};

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

/// Model served by Ollama's default embeddings setup.
pub const DEFAULT_REMOTE_MODEL: &str = "nomic-embed-text";

/// Output dimension of well-known hosted embedding models.
pub fn known_dimension(model: &str) -> Option<usize> {
    let name = model.split(':').next().unwrap_or(model);
    match name {
        "nomic-embed-text" => Some(768),
        "mxbai-embed-large" => Some(1024),
        "all-minilm" => Some(384),
        "text-embedding-3-small" | "text-embedding-ada-002" => Some(1536),
        "text-embedding-3-large" => Some(3072),
        _ => None,
    }
}

/// Embedder backed by an HTTP embeddings API.
pub struct RemoteEmbedder {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    dimension: usize,
    max_input_chars: usize,
}

impl RemoteEmbedder {
    /// Creates an embedder for `model` served at `base_url`.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        dimension: usize,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            dimension,
            max_input_chars: super::hashing::DEFAULT_MAX_INPUT_CHARS,
        }
    }

    pub fn with_max_input_chars(mut self, max: usize) -> Self {
        self.max_input_chars = max;
        self
    }

    /// Overrides the HTTP client (useful for custom timeouts or proxies).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(ref api_key) = self.api_key {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", api_key)) {
                headers.insert(AUTHORIZATION, value);
            }
        }

        headers
    }

    fn parse_response(&self, response: EmbeddingResponse) -> Result<Embedding> {
        let data = response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::Provider("no embedding in response".to_string()))?;

        if data.embedding.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: data.embedding.len(),
            });
        }

        Embedding::new(data.embedding)
            .normalized()
            .ok_or_else(|| EmbeddingError::Provider("provider returned a degenerate vector".into()))
    }
}

#[async_trait]
impl Embedder for RemoteEmbedder {
    fn name(&self) -> &str {
        "remote"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn max_input_length(&self) -> usize {
        self.max_input_chars
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        check_input(text, self.max_input_chars)?;

        let url = format!("{}/embeddings", self.base_url);
        let body = EmbeddingRequest {
            model: &self.model,
            input: text,
        };

        let response = self
            .client
            .post(&url)
            .headers(self.build_headers())
            .json(&body)
            .send()
            .await
            .map_err(|e| EmbeddingError::Provider(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EmbeddingError::Provider(format!(
                "HTTP {}",
                response.status().as_u16()
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Provider(format!("Failed to parse response: {}", e)))?;

        self.parse_response(parsed)
    }
}
