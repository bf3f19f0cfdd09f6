//! Query-to-candidates retrieval.
//!
//! Embeds the query, pulls nearest neighbors from the index, then applies the
//! similarity floor and any metadata filter. Fewer than `top_k` survivors is a
//! normal outcome; the list is never padded with weaker matches.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ScoredCandidate;
use crate::embedding::{Embedder, EmbeddingError};
use crate::index::{ExpertIndex, IndexError};

use super::ExpertFilter;

/// Errors that can occur during retrieval.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Query embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Index lookup failed: {0}")]
    Index(#[from] IndexError),
}

impl RetrievalError {
    /// Whether the query text itself was rejected, as opposed to a backend
    /// failure that may clear up on retry.
    pub fn is_invalid_query(&self) -> bool {
        matches!(
            self,
            Self::Embedding(EmbeddingError::EmptyInput | EmbeddingError::InputTooLong { .. })
        )
    }
}

/// Result type for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Retrieval policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// How many times `top_k` to fetch from the index when a metadata filter
    /// will discard some results afterwards.
    pub pool_multiplier: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { pool_multiplier: 4 }
    }
}

/// Parameters for a single retrieval.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalRequest {
    pub top_k: usize,
    pub min_score: f32,
    pub filter: Option<ExpertFilter>,
}

impl RetrievalRequest {
    pub fn new(top_k: usize, min_score: f32) -> Self {
        Self {
            top_k,
            min_score,
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: ExpertFilter) -> Self {
        self.filter = Some(filter).filter(|f| !f.is_empty());
        self
    }
}

/// Finds the experts closest to a query.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<ExpertIndex>,
    config: RetrievalConfig,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<ExpertIndex>) -> Self {
        Self::with_config(embedder, index, RetrievalConfig::default())
    }

    pub fn with_config(
        embedder: Arc<dyn Embedder>,
        index: Arc<ExpertIndex>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            config,
        }
    }

    pub fn index(&self) -> &Arc<ExpertIndex> {
        &self.index
    }

    /// Returns at most `top_k` candidates scoring at least `min_score`,
    /// ranked by descending similarity.
    pub async fn retrieve(
        &self,
        query_text: &str,
        top_k: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredCandidate>> {
        self.retrieve_with(query_text, &RetrievalRequest::new(top_k, min_score))
            .await
    }

    /// Like [`retrieve`](Self::retrieve), with an optional metadata filter.
    pub async fn retrieve_with(
        &self,
        query_text: &str,
        request: &RetrievalRequest,
    ) -> Result<Vec<ScoredCandidate>> {
        let filter = request.filter.as_ref().filter(|f| !f.is_empty());
        let pool = match filter {
            Some(_) => request
                .top_k
                .saturating_mul(self.config.pool_multiplier.max(1)),
            None => request.top_k,
        };

        let query = self.embedder.embed_query(query_text).await?;
        let hits = self.index.query(&query, pool).await?;

        let mut candidates = Vec::with_capacity(request.top_k.min(hits.len()));
        for (id, score) in hits {
            if candidates.len() == request.top_k {
                break;
            }
            // Hits are sorted, so nothing after this can clear the floor.
            if score < request.min_score {
                break;
            }

            let expert = match self.index.get(&id).await {
                Ok(profile) => profile,
                Err(IndexError::NotFound(_)) => {
                    tracing::debug!(expert_id = %id, "Expert removed during retrieval, skipping");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            if filter.map_or(true, |f| f.matches(&expert)) {
                candidates.push(ScoredCandidate {
                    expert,
                    score,
                    rank: candidates.len() + 1,
                });
            }
        }

        tracing::debug!(
            top_k = request.top_k,
            pool,
            min_score = request.min_score,
            found = candidates.len(),
            "Retrieved candidates"
        );

        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExpertId, ExpertProfile, ORGANIZATION_KEY};
    use crate::embedding::{Embedding, HashingEmbedder};
    use async_trait::async_trait;

    /// Maps known query strings to fixed vectors.
    struct FixedEmbedder;

    #[async_trait]
    impl Embedder for FixedEmbedder {
        fn name(&self) -> &str {
            "fixed"
        }

        fn dimension(&self) -> usize {
            2
        }

        fn max_input_length(&self) -> usize {
            100
        }

        async fn embed(&self, text: &str) -> crate::embedding::Result<Embedding> {
            match text {
                "" => Err(EmbeddingError::EmptyInput),
                _ => Ok(Embedding::new(vec![1.0, 0.0])),
            }
        }
    }

    /// Unit vector with cosine `score` against `[1, 0]`.
    fn at_score(score: f32) -> Embedding {
        Embedding::new(vec![score, (1.0 - score * score).max(0.0).sqrt()])
    }

    async fn abc_index() -> Arc<ExpertIndex> {
        let index = ExpertIndex::in_memory().await.unwrap();
        index
            .upsert(
                ExpertProfile::new("A", "Amal", "a").with_metadata(ORGANIZATION_KEY, "MSF"),
                at_score(0.9),
            )
            .await
            .unwrap();
        index
            .upsert(
                ExpertProfile::new("B", "Basel", "b").with_metadata(ORGANIZATION_KEY, "WHO"),
                at_score(0.75),
            )
            .await
            .unwrap();
        index
            .upsert(
                ExpertProfile::new("C", "Carim", "c").with_metadata(ORGANIZATION_KEY, "MSF"),
                at_score(0.4),
            )
            .await
            .unwrap();
        Arc::new(index)
    }

    fn ids(candidates: &[ScoredCandidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.id().as_str()).collect()
    }

    #[tokio::test]
    async fn top_k_and_min_score_select_a_and_b() {
        let retriever = Retriever::new(Arc::new(FixedEmbedder), abc_index().await);

        let candidates = retriever.retrieve("anything", 2, 0.5).await.unwrap();

        assert_eq!(ids(&candidates), vec!["A", "B"]);
        assert_eq!(candidates[0].rank, 1);
        assert_eq!(candidates[1].rank, 2);
        assert!((candidates[0].score - 0.9).abs() < 1e-4);
        assert!((candidates[1].score - 0.75).abs() < 1e-4);
    }

    #[tokio::test]
    async fn never_pads_below_min_score() {
        let retriever = Retriever::new(Arc::new(FixedEmbedder), abc_index().await);
        let candidates = retriever.retrieve("anything", 10, 0.5).await.unwrap();
        assert_eq!(ids(&candidates), vec!["A", "B"]);
    }

    #[tokio::test]
    async fn min_score_above_everything_is_empty_not_error() {
        let retriever = Retriever::new(Arc::new(FixedEmbedder), abc_index().await);
        let candidates = retriever.retrieve("anything", 3, 0.95).await.unwrap();
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn scores_are_non_increasing_and_bounded_by_k() {
        let retriever = Retriever::new(Arc::new(FixedEmbedder), abc_index().await);
        for k in 1..=4 {
            let candidates = retriever.retrieve("q", k, -1.0).await.unwrap();
            assert!(candidates.len() <= k);
            for pair in candidates.windows(2) {
                assert!(pair[0].score >= pair[1].score);
            }
        }
    }

    #[tokio::test]
    async fn filter_widens_pool() {
        let retriever = Retriever::new(Arc::new(FixedEmbedder), abc_index().await);
        let request = RetrievalRequest::new(1, 0.0)
            .with_filter(ExpertFilter::new().metadata_equals(ORGANIZATION_KEY, "WHO"));

        let candidates = retriever.retrieve_with("q", &request).await.unwrap();

        assert_eq!(ids(&candidates), vec!["B"]);
        assert_eq!(candidates[0].rank, 1);
    }

    #[tokio::test]
    async fn filter_respects_top_k() {
        let retriever = Retriever::new(Arc::new(FixedEmbedder), abc_index().await);
        let request = RetrievalRequest::new(1, 0.0)
            .with_filter(ExpertFilter::new().metadata_equals(ORGANIZATION_KEY, "MSF"));

        let candidates = retriever.retrieve_with("q", &request).await.unwrap();
        assert_eq!(ids(&candidates), vec!["A"]);
    }

    #[tokio::test]
    async fn empty_index_yields_empty() {
        let index = Arc::new(ExpertIndex::in_memory().await.unwrap());
        let retriever = Retriever::new(Arc::new(HashingEmbedder::default()), index);
        assert!(retriever.retrieve("anyone?", 5, 0.0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn embedder_failure_is_retrieval_error() {
        let retriever = Retriever::new(Arc::new(FixedEmbedder), abc_index().await);
        assert!(matches!(
            retriever.retrieve("", 2, 0.0).await,
            Err(RetrievalError::Embedding(EmbeddingError::EmptyInput))
        ));
    }

    #[tokio::test]
    async fn dimension_mismatch_is_retrieval_error() {
        let retriever = Retriever::new(Arc::new(HashingEmbedder::new(8)), abc_index().await);
        let err = retriever.retrieve("water", 2, 0.0).await.unwrap_err();
        assert!(matches!(
            err,
            RetrievalError::Index(IndexError::DimensionMismatch { .. })
        ));
        assert!(!err.is_invalid_query());
    }

    #[test]
    fn input_errors_are_invalid_queries() {
        assert!(RetrievalError::Embedding(EmbeddingError::EmptyInput).is_invalid_query());
        assert!(RetrievalError::Embedding(EmbeddingError::InputTooLong {
            length: 9_000,
            max: 8_192
        })
        .is_invalid_query());
        let provider_down = RetrievalError::Embedding(EmbeddingError::Provider("down".into()));
        assert!(!provider_down.is_invalid_query());
    }

    #[tokio::test]
    async fn candidate_ids_exist_in_store() {
        let index = abc_index().await;
        let retriever = Retriever::new(Arc::new(FixedEmbedder), index.clone());
        for candidate in retriever.retrieve("q", 3, -1.0).await.unwrap() {
            assert!(index.contains(&ExpertId::from(candidate.id().as_str())).await);
        }
    }
}
