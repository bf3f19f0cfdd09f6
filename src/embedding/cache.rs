//! LRU cache in front of an embedder.
//!
//! Popular queries repeat; embedding them again costs a model call. Because
//! embedders are deterministic, caching by exact text is safe.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lru::LruCache;

use super::engine::{Embedder, Embedding, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Purpose {
    Plain,
    Query,
    Document,
}

/// Caching wrapper around any [`Embedder`].
pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    cache: Mutex<LruCache<(Purpose, String), Embedding>>,
}

impl CachedEmbedder {
    /// Wraps `inner` with room for `capacity` vectors (minimum one).
    pub fn new(inner: Arc<dyn Embedder>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Number of cached vectors.
    pub fn len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, key: &(Purpose, String)) -> Option<Embedding> {
        self.cache.lock().ok()?.get(key).cloned()
    }

    fn store(&self, key: (Purpose, String), embedding: &Embedding) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(key, embedding.clone());
        }
    }

    async fn cached(&self, purpose: Purpose, text: &str) -> Result<Embedding> {
        let key = (purpose, text.to_string());
        if let Some(hit) = self.lookup(&key) {
            tracing::trace!(embedder = self.inner.name(), "embedding cache hit");
            return Ok(hit);
        }

        // The lock is not held across the model call; two concurrent misses
        // for the same text both compute the same vector.
        let embedding = match purpose {
            Purpose::Plain => self.inner.embed(text).await?,
            Purpose::Query => self.inner.embed_query(text).await?,
            Purpose::Document => self.inner.embed_document(text).await?,
        };
        self.store(key, &embedding);
        Ok(embedding)
    }
}

#[async_trait]
impl Embedder for CachedEmbedder {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn max_input_length(&self) -> usize {
        self.inner.max_input_length()
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        self.cached(Purpose::Plain, text).await
    }

    async fn embed_query(&self, text: &str) -> Result<Embedding> {
        self.cached(Purpose::Query, text).await
    }

    async fn embed_document(&self, text: &str) -> Result<Embedding> {
        self.cached(Purpose::Document, text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{EmbeddingError, HashingEmbedder};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEmbedder {
        inner: HashingEmbedder,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        fn name(&self) -> &str {
            "counting"
        }

        fn dimension(&self) -> usize {
            self.inner.dimension()
        }

        fn max_input_length(&self) -> usize {
            self.inner.max_input_length()
        }

        async fn embed(&self, text: &str) -> Result<Embedding> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.embed(text).await
        }
    }

    fn counting() -> Arc<CountingEmbedder> {
        Arc::new(CountingEmbedder {
            inner: HashingEmbedder::new(16),
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn repeated_text_hits_cache() {
        let inner = counting();
        let cached = CachedEmbedder::new(inner.clone(), 8);

        let a = cached.embed_query("solar microgrids").await.unwrap();
        let b = cached.embed_query("solar microgrids").await.unwrap();

        assert_eq!(a, b);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cached.len(), 1);
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let inner = counting();
        let cached = CachedEmbedder::new(inner.clone(), 8);

        assert!(matches!(cached.embed("").await, Err(EmbeddingError::EmptyInput)));
        assert!(cached.is_empty());
    }

    #[tokio::test]
    async fn capacity_evicts_oldest() {
        let inner = counting();
        let cached = CachedEmbedder::new(inner.clone(), 1);

        cached.embed("first").await.unwrap();
        cached.embed("second").await.unwrap();
        cached.embed("first").await.unwrap();

        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
        assert_eq!(cached.dimension(), 16);
    }
}
