//! External service providers.
//!
//! - [`ai`] - generative model providers (OpenAI-compatible, Ollama)

pub mod ai;
