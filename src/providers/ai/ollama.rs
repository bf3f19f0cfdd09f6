//! Ollama provider implementation.
//!
//! Ollama exposes an OpenAI-compatible API, so this is a thin wrapper
//! around OpenAiCompatibleProvider with Ollama-specific defaults.

use std::time::Duration;

use super::openai::OpenAiCompatibleProvider;
use super::traits::{CompletionRequest, CompletionResponse, LlmProvider, LlmResult};
use async_trait::async_trait;

/// Default Ollama API URL.
pub const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434/v1";

/// Context lengths for common Ollama models.
fn model_context_length(model: &str) -> usize {
    match model {
        m if m.starts_with("llama3.2") || m.starts_with("llama3.1") => 128_000,
        m if m.starts_with("llama3") => 8_192,
        m if m.starts_with("mistral") || m.starts_with("mixtral") => 32_768,
        m if m.starts_with("qwen2") => 32_768,
        m if m.starts_with("gemma") => 8_192,
        m if m.starts_with("phi") => 2_048,
        _ => 4_096,
    }
}

/// Provider for a local Ollama server.
pub struct OllamaProvider {
    inner: OpenAiCompatibleProvider,
}

impl OllamaProvider {
    /// Creates a new Ollama provider with default localhost URL.
    pub fn new(model: impl Into<String>) -> Self {
        Self::with_url(OLLAMA_DEFAULT_URL, model)
    }

    /// Creates a new Ollama provider with a custom URL.
    pub fn with_url(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        let context_length = model_context_length(&model);

        let inner = OpenAiCompatibleProvider::custom(base_url, None, model)
            .with_context_length(context_length);

        Self { inner }
    }

    /// Creates a provider with the llama3.2 model.
    pub fn llama3() -> Self {
        Self::new("llama3.2")
    }

    /// Applies a per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> LlmResult<Self> {
        self.inner = self.inner.with_timeout(timeout)?;
        Ok(self)
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn complete(&self, request: &CompletionRequest) -> LlmResult<CompletionResponse> {
        self.inner.complete(request).await
    }

    fn max_context_length(&self) -> usize {
        self.inner.max_context_length()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_context_length() {
        assert_eq!(model_context_length("llama3.2"), 128_000);
        assert_eq!(model_context_length("llama3"), 8_192);
        assert_eq!(model_context_length("mixtral-8x7b"), 32_768);
        assert_eq!(model_context_length("phi3"), 2_048);
        assert_eq!(model_context_length("unknown-model"), 4_096);
    }

    #[test]
    fn test_default_provider() {
        let provider = OllamaProvider::llama3();
        assert_eq!(provider.name(), "ollama");
        assert_eq!(provider.model(), "llama3.2");
        assert_eq!(provider.max_context_length(), 128_000);
    }

    #[test]
    fn test_custom_url() {
        let provider = OllamaProvider::with_url("http://192.168.1.100:11434/v1", "mistral");
        assert_eq!(provider.model(), "mistral");
        assert_eq!(provider.max_context_length(), 32_768);
    }
}
