//! Embedding vectors and the embedder trait.
//!
//! An [`Embedder`] turns text into a fixed-length [`Embedding`]. Every backend
//! must be deterministic for a fixed model version and must refuse input it
//! cannot represent faithfully rather than truncating it.

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while generating embeddings.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("Cannot embed empty text")]
    EmptyInput,

    #[error("Input too long: {length} exceeds model maximum of {max}")]
    InputTooLong { length: usize, max: usize },

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Model error: {0}")]
    Model(String),

    #[error("Embedding provider request failed: {0}")]
    Provider(String),
}

/// Result type for embedding operations.
pub type Result<T> = std::result::Result<T, EmbeddingError>;

/// A vector embedding representing text semantics.
///
/// The dimensionality depends on the model used (e.g. 384 for MiniLM).
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    /// The embedding vector.
    pub values: Vec<f32>,
}

impl Embedding {
    /// Creates a new embedding from a vector of values.
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Returns the dimensionality of this embedding.
    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    /// Euclidean length of the vector.
    pub fn norm(&self) -> f32 {
        self.values.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    /// Returns a unit-length copy, or `None` for the zero vector or any
    /// non-finite component.
    pub fn normalized(&self) -> Option<Embedding> {
        if self.values.iter().any(|x| !x.is_finite()) {
            return None;
        }
        let norm = self.norm();
        if norm == 0.0 || !norm.is_finite() {
            return None;
        }
        Some(Embedding::new(self.values.iter().map(|x| x / norm).collect()))
    }

    /// Dot product. Callers must check dimensions first.
    pub fn dot(&self, other: &Embedding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| a * b)
            .sum()
    }

    /// Computes cosine similarity with another embedding.
    ///
    /// Returns a value between -1.0 and 1.0, where 1.0 means identical
    /// direction. Mismatched dimensions are an error, never a silent zero.
    pub fn cosine_similarity(&self, other: &Embedding) -> Result<f32> {
        if self.dimension() != other.dimension() {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension(),
                actual: other.dimension(),
            });
        }

        let norm_a = self.norm();
        let norm_b = other.norm();
        if norm_a == 0.0 || norm_b == 0.0 {
            return Ok(0.0);
        }

        Ok((self.dot(other) / (norm_a * norm_b)).clamp(-1.0, 1.0))
    }
}

/// A text embedding backend.
///
/// Implementations may run locally or call a remote service, but must not
/// mutate shared state observable by other callers.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Backend name for logs (e.g. "hashing", "candle", "remote").
    fn name(&self) -> &str;

    /// Length of every vector this embedder produces.
    fn dimension(&self) -> usize;

    /// Maximum accepted input length, in the backend's own unit
    /// (tokens for local transformer models, characters otherwise).
    fn max_input_length(&self) -> usize;

    /// Embeds a single text.
    async fn embed(&self, text: &str) -> Result<Embedding>;

    /// Embeds a search query. Models trained with asymmetric prompts override
    /// this to add their query prefix.
    async fn embed_query(&self, text: &str) -> Result<Embedding> {
        self.embed(text).await
    }

    /// Embeds a document (an expert profile) for indexing.
    async fn embed_document(&self, text: &str) -> Result<Embedding> {
        self.embed(text).await
    }
}

/// Rejects blank input and input longer than `max` characters.
pub(crate) fn check_input(text: &str, max: usize) -> Result<()> {
    if text.trim().is_empty() {
        return Err(EmbeddingError::EmptyInput);
    }
    let length = text.chars().count();
    if length > max {
        return Err(EmbeddingError::InputTooLong { length, max });
    }
    Ok(())
}
