//! Per-query options and their validation.

use std::time::Duration;

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::domain::{ScoredCandidate, SynthesisResult};
use crate::retrieval::{ExpertFilter, RetrievalRequest};

/// Default number of experts to retrieve.
pub const DEFAULT_TOP_K: usize = 5;

/// Default end-to-end deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Invalid caller-supplied query parameters.
///
/// The only error the pipeline returns; everything downstream of validation
/// degrades instead of failing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("Query text is empty")]
    EmptyQuery,

    #[error("top_k must be at least 1")]
    InvalidTopK,

    #[error("min_score must be a finite value between -1 and 1, got {0}")]
    InvalidMinScore(f32),

    #[error("Timeout must be greater than zero")]
    InvalidTimeout,
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, ConfigurationError>;

/// Parameters for a single query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    pub top_k: usize,
    pub min_score: f32,
    pub timeout: Duration,
    pub filter: Option<ExpertFilter>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            min_score: 0.0,
            timeout: DEFAULT_TIMEOUT,
            filter: None,
        }
    }
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn filter(mut self, filter: ExpertFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Checks the options without looking at the query text.
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(ConfigurationError::InvalidTopK);
        }
        if !self.min_score.is_finite() || !(-1.0..=1.0).contains(&self.min_score) {
            return Err(ConfigurationError::InvalidMinScore(self.min_score));
        }
        if self.timeout.is_zero() {
            return Err(ConfigurationError::InvalidTimeout);
        }
        Ok(())
    }

    pub(crate) fn retrieval_request(&self) -> RetrievalRequest {
        let request = RetrievalRequest::new(self.top_k, self.min_score);
        match &self.filter {
            Some(filter) => request.with_filter(filter.clone()),
            None => request,
        }
    }
}

/// Everything produced for one query: the answer plus the ranked experts it
/// was grounded on.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    pub synthesis: SynthesisResult,
    pub candidates: Vec<ScoredCandidate>,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
}

fn as_millis<S: Serializer>(elapsed: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let options = QueryOptions::default();
        assert_eq!(options.top_k, 5);
        assert_eq!(options.min_score, 0.0);
        assert_eq!(options.timeout, Duration::from_secs(30));
        assert!(options.validate().is_ok());
    }

    #[test]
    fn zero_top_k_is_rejected() {
        assert_eq!(
            QueryOptions::new().top_k(0).validate(),
            Err(ConfigurationError::InvalidTopK)
        );
    }

    #[test]
    fn min_score_must_be_finite_and_in_range() {
        assert!(QueryOptions::new().min_score(-1.0).validate().is_ok());
        assert!(QueryOptions::new().min_score(1.0).validate().is_ok());
        assert!(matches!(
            QueryOptions::new().min_score(1.5).validate(),
            Err(ConfigurationError::InvalidMinScore(_))
        ));
        assert!(matches!(
            QueryOptions::new().min_score(f32::NAN).validate(),
            Err(ConfigurationError::InvalidMinScore(_))
        ));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        assert_eq!(
            QueryOptions::new().timeout(Duration::ZERO).validate(),
            Err(ConfigurationError::InvalidTimeout)
        );
    }

    #[test]
    fn empty_filter_is_dropped_from_request() {
        let request = QueryOptions::new().filter(ExpertFilter::new()).retrieval_request();
        assert!(request.filter.is_none());
    }

    #[test]
    fn outcome_serializes_elapsed_as_millis() {
        let outcome = QueryOutcome {
            synthesis: SynthesisResult::generated("ok", vec![]),
            candidates: vec![],
            elapsed: Duration::from_millis(1250),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["elapsed_ms"], 1250);
        assert_eq!(json["synthesis"]["answer_text"], "ok");
    }
}
