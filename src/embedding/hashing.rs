//! Feature-hashing embedder.
//!
//! Maps lowercased word tokens into a fixed number of buckets and
//! L2-normalizes the counts. It needs no model download, so it is the
//! offline default and the embedder used throughout the test suite. Texts that
//! share vocabulary land close together; it has no notion of synonyms.

use async_trait::async_trait;

use super::engine::{check_input, Embedder, Embedding, EmbeddingError, Result};

/// Default bucket count.
pub const DEFAULT_HASHING_DIMENSION: usize = 384;

/// Default maximum input length in characters.
pub const DEFAULT_MAX_INPUT_CHARS: usize = 8_192;

/// Deterministic bag-of-words embedder.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
    max_input_chars: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_HASHING_DIMENSION)
    }
}

impl HashingEmbedder {
    /// Creates an embedder producing vectors of `dimension` buckets.
    ///
    /// A zero dimension is bumped to one so every vector stays well-formed.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
        }
    }

    pub fn with_max_input_chars(mut self, max: usize) -> Self {
        self.max_input_chars = max;
        self
    }

    /// Splits text into lowercased alphanumeric tokens.
    fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
    }

    /// djb2 over the token bytes. Stable across platforms and releases.
    fn token_hash(token: &str) -> u64 {
        let mut hash: u64 = 5381;
        for byte in token.bytes() {
            hash = hash.wrapping_mul(33).wrapping_add(byte as u64);
        }
        hash
    }

    fn embed_sync(&self, text: &str) -> Result<Embedding> {
        check_input(text, self.max_input_chars)?;

        let mut values = vec![0.0f32; self.dimension];
        let mut seen_any = false;
        for token in Self::tokenize(text) {
            let bucket = (Self::token_hash(&token) % self.dimension as u64) as usize;
            values[bucket] += 1.0;
            seen_any = true;
        }

        // Punctuation-only input has no tokens to place.
        if !seen_any {
            return Err(EmbeddingError::EmptyInput);
        }

        Embedding::new(values)
            .normalized()
            .ok_or_else(|| EmbeddingError::Model("hashing produced a degenerate vector".into()))
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn max_input_length(&self) -> usize {
        self.max_input_chars
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        self.embed_sync(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn embed_produces_consistent_output() {
        let embedder = HashingEmbedder::default();
        let a = embedder.embed("Hello, world!").await.unwrap();
        let b = embedder.embed("Hello, world!").await.unwrap();
        assert_eq!(a.values, b.values);
    }

    #[tokio::test]
    async fn embed_has_configured_dimension_and_unit_norm() {
        let embedder = HashingEmbedder::new(64);
        let e = embedder.embed("distributed consensus protocols").await.unwrap();
        assert_eq!(e.dimension(), 64);
        assert!((e.norm() - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn case_and_punctuation_are_ignored() {
        let embedder = HashingEmbedder::default();
        let a = embedder.embed("Water Sanitation").await.unwrap();
        let b = embedder.embed("water, sanitation!").await.unwrap();
        assert_eq!(a.values, b.values);
    }

    #[tokio::test]
    async fn shared_vocabulary_scores_higher() {
        let embedder = HashingEmbedder::default();
        let query = embedder.embed("pediatric surgery").await.unwrap();
        let close = embedder.embed("pediatric surgery and trauma care").await.unwrap();
        let far = embedder.embed("tax law and accounting").await.unwrap();

        let close_score = query.cosine_similarity(&close).unwrap();
        let far_score = query.cosine_similarity(&far).unwrap();
        assert!(close_score > far_score);
    }

    #[tokio::test]
    async fn empty_input_is_rejected() {
        let embedder = HashingEmbedder::default();
        assert!(matches!(embedder.embed("").await, Err(EmbeddingError::EmptyInput)));
        assert!(matches!(embedder.embed("?!").await, Err(EmbeddingError::EmptyInput)));
    }

    #[tokio::test]
    async fn overlong_input_is_rejected_not_truncated() {
        let embedder = HashingEmbedder::default().with_max_input_chars(5);
        assert!(matches!(
            embedder.embed("too long text").await,
            Err(EmbeddingError::InputTooLong { max: 5, .. })
        ));
    }

    #[tokio::test]
    async fn non_latin_scripts_tokenize() {
        let embedder = HashingEmbedder::default();
        let e = embedder.embed("طب الأطفال").await.unwrap();
        assert!((e.norm() - 1.0).abs() < 1e-5);
    }
}
