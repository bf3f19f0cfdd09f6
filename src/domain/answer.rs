//! Per-query result types: ranked candidates and synthesized answers.
//!
//! None of these are persisted; they are produced for a single query and
//! handed back to the caller.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{ExpertId, ExpertProfile};

/// An expert matched against a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub expert: ExpertProfile,
    /// Cosine similarity to the query, in `[-1.0, 1.0]`.
    pub score: f32,
    /// 1-based position after sorting and filtering.
    pub rank: usize,
}

impl ScoredCandidate {
    pub fn id(&self) -> &ExpertId {
        &self.expert.id
    }
}

/// Category of a failed generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationFailureKind {
    /// The provider did not answer in time.
    Timeout,
    /// The provider throttled the request.
    RateLimited,
    /// The provider answered with something unusable (unparseable, empty).
    Malformed,
    /// The provider could not be reached or is not configured.
    Unavailable,
    /// Any other provider-side error (auth, 5xx, context overflow).
    Provider,
}

impl fmt::Display for GenerationFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Timeout => "timeout",
            Self::RateLimited => "rate limited",
            Self::Malformed => "malformed response",
            Self::Unavailable => "unavailable",
            Self::Provider => "provider error",
        };
        f.write_str(s)
    }
}

/// Why an answer was produced without generative synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "kind")]
pub enum DegradationReason {
    /// Retrieval produced nothing to ground an answer on.
    NoCandidates,
    /// The query text cannot be embedded as written (too long, or no usable
    /// tokens). Retrying the same text will not help.
    InvalidQuery,
    /// Embedding or index lookup failed.
    RetrievalFailed,
    /// The generative model call failed.
    GenerationFailed(GenerationFailureKind),
    /// The request deadline elapsed before the answer was ready.
    TimedOut,
}

/// The answer returned for a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisResult {
    pub answer_text: String,
    /// Ids of the experts included in the grounding context, in rank order.
    pub cited_experts: Vec<ExpertId>,
    /// Set when the answer is a deterministic fallback rather than generated.
    pub degraded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degradation: Option<DegradationReason>,
}

impl SynthesisResult {
    /// A generated answer.
    pub fn generated(answer_text: impl Into<String>, cited_experts: Vec<ExpertId>) -> Self {
        Self {
            answer_text: answer_text.into(),
            cited_experts,
            degraded: false,
            degradation: None,
        }
    }

    /// A fallback answer.
    pub fn degraded(
        answer_text: impl Into<String>,
        cited_experts: Vec<ExpertId>,
        reason: DegradationReason,
    ) -> Self {
        Self {
            answer_text: answer_text.into(),
            cited_experts,
            degraded: true,
            degradation: Some(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_is_not_degraded() {
        let result = SynthesisResult::generated("answer", vec![ExpertId::from("a")]);
        assert!(!result.degraded);
        assert!(result.degradation.is_none());
    }

    #[test]
    fn degraded_carries_reason() {
        let result = SynthesisResult::degraded("fallback", vec![], DegradationReason::NoCandidates);
        assert!(result.degraded);
        assert_eq!(result.degradation, Some(DegradationReason::NoCandidates));
    }

    #[test]
    fn degradation_reason_serialization() {
        let json = serde_json::to_string(&DegradationReason::GenerationFailed(
            GenerationFailureKind::RateLimited,
        ))
        .unwrap();
        assert_eq!(json, r#"{"reason":"generation_failed","kind":"rate_limited"}"#);

        let json = serde_json::to_string(&DegradationReason::TimedOut).unwrap();
        assert_eq!(json, r#"{"reason":"timed_out"}"#);
    }

    #[test]
    fn generated_result_omits_degradation_field() {
        let json = serde_json::to_string(&SynthesisResult::generated("hi", vec![])).unwrap();
        assert!(!json.contains("degradation"));
        assert!(json.contains("\"degraded\":false"));
    }
}
