//! Generative model providers.
//!
//! A unified interface over chat-completion APIs. The answer synthesizer only
//! depends on [`LlmProvider`], so any backend (or a test double) can be
//! injected.
//!
//! # Supported Providers
//!
//! - **OpenAI-compatible**: OpenAI, Groq, vLLM, LM Studio
//! - **Ollama**: local inference via Ollama's OpenAI-compatible endpoint
//!
//! # Example
//!
//! ```rust,no_run
//! use expert_finder::providers::ai::{
//!     CompletionRequest, LlmProvider, Message, OpenAiCompatibleProvider, GROQ_DEFAULT_MODEL,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let groq = OpenAiCompatibleProvider::groq("gsk_...", GROQ_DEFAULT_MODEL);
//!
//! let request = CompletionRequest::new(vec![Message::user("Who can advise on solar microgrids?")])
//!     .with_system_prompt("Answer in one short paragraph.");
//!
//! let response = groq.complete(&request).await?;
//! println!("{}", response.text);
//! # Ok(())
//! # }
//! ```

mod ollama;
mod openai;
mod traits;

pub use ollama::{OllamaProvider, OLLAMA_DEFAULT_URL};
pub use openai::{OpenAiCompatibleProvider, GROQ_BASE_URL, GROQ_DEFAULT_MODEL, OPENAI_BASE_URL};
pub use traits::{
    CompletionRequest, CompletionResponse, FinishReason, LlmError, LlmProvider, LlmResult,
    Message, Role, TokenUsage,
};
