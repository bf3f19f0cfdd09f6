//! Grounded answer synthesis.
//!
//! Turns ranked candidates into a natural-language answer with a generative
//! model. Any model failure is absorbed here: the caller always gets a
//! [`SynthesisResult`], degraded to a deterministic listing when needed.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::{
    DegradationReason, ExpertId, GenerationFailureKind, ScoredCandidate, SynthesisResult,
    ORGANIZATION_KEY, TAGS_KEY,
};
use crate::providers::ai::{CompletionRequest, LlmError, LlmProvider, LlmResult, Message};

use super::GroundingContext;

/// Answer returned when retrieval found nobody.
pub const NO_EXPERTS_ANSWER: &str = "No experts found matching your query.";

/// Answer returned when retrieval itself failed.
pub const SEARCH_FAILED_ANSWER: &str =
    "Expert search is temporarily unavailable. Please try again later.";

/// Answer returned when the query text could not be embedded.
pub const INVALID_QUERY_ANSWER: &str =
    "The question could not be searched as written. Please shorten or rephrase it.";

/// Answer returned when the deadline passed before any expert was found.
pub const SEARCH_TIMED_OUT_ANSWER: &str =
    "The search timed out before any experts were found. Please try again.";

const FALLBACK_INTRO: &str =
    "A written answer could not be generated. These experts best match your query:";

const DEFAULT_SYSTEM_PROMPT: &str = "You help people find subject-matter experts. \
Using only the experts listed in the user's message, answer the question in one short paragraph. \
Refer to experts by name and do not invent experts, credentials or contact details.";

/// Smallest accepted `max_context_chars`; leaves room for one expert's name,
/// metadata and some profile text.
pub const MIN_CONTEXT_CHARS: usize = 200;

/// Synthesis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Character budget for the grounding context.
    pub max_context_chars: usize,
    pub system_prompt: String,
    pub temperature: f32,
    pub max_tokens: Option<usize>,
    /// Metadata keys rendered into each context block.
    pub context_metadata_keys: Vec<String>,
    /// First line of a degraded answer that lists experts.
    pub fallback_intro: String,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            max_context_chars: 4000,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: 0.3,
            max_tokens: Some(400),
            context_metadata_keys: vec![ORGANIZATION_KEY.to_string(), TAGS_KEY.to_string()],
            fallback_intro: FALLBACK_INTRO.to_string(),
        }
    }
}

/// Result of one generation attempt, validated right after the provider call.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    Success(String),
    Failure {
        kind: GenerationFailureKind,
        detail: String,
    },
}

impl GenerationOutcome {
    /// Classifies a provider response. Blank text counts as malformed.
    pub fn from_response(result: LlmResult<String>) -> Self {
        match result {
            Ok(text) if text.trim().is_empty() => Self::Failure {
                kind: GenerationFailureKind::Malformed,
                detail: "model returned an empty answer".to_string(),
            },
            Ok(text) => Self::Success(text.trim().to_string()),
            Err(err) => Self::Failure {
                kind: failure_kind(&err),
                detail: err.to_string(),
            },
        }
    }
}

/// Maps a provider error onto a failure category.
pub fn failure_kind(err: &LlmError) -> GenerationFailureKind {
    match err {
        LlmError::Timeout => GenerationFailureKind::Timeout,
        LlmError::RateLimited { .. } => GenerationFailureKind::RateLimited,
        LlmError::InvalidResponse(_) => GenerationFailureKind::Malformed,
        LlmError::Unavailable(_) => GenerationFailureKind::Unavailable,
        LlmError::ApiError { status, .. } if (502..=504).contains(status) => {
            GenerationFailureKind::Unavailable
        }
        LlmError::HttpError(e) if e.is_timeout() => GenerationFailureKind::Timeout,
        LlmError::HttpError(e) if e.is_connect() => GenerationFailureKind::Unavailable,
        LlmError::HttpError(e) if e.is_decode() => GenerationFailureKind::Malformed,
        LlmError::HttpError(_) | LlmError::ApiError { .. } | LlmError::AuthenticationError(_) => {
            GenerationFailureKind::Provider
        }
    }
}

/// A query and its grounding context, ready for generation.
#[derive(Debug, Clone)]
pub struct PreparedSynthesis {
    query: String,
    context: GroundingContext,
    /// Fallback labels of the cited experts, in rank order.
    labels: Vec<String>,
}

impl PreparedSynthesis {
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn context(&self) -> &GroundingContext {
        &self.context
    }

    pub fn cited_experts(&self) -> &[ExpertId] {
        self.context.cited_experts()
    }

    pub fn is_empty(&self) -> bool {
        self.context.is_empty()
    }
}

/// Produces answers grounded in retrieved experts.
pub struct AnswerSynthesizer {
    provider: Arc<dyn LlmProvider>,
    config: SynthesisConfig,
}

impl AnswerSynthesizer {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self::with_config(provider, SynthesisConfig::default())
    }

    pub fn with_config(provider: Arc<dyn LlmProvider>, config: SynthesisConfig) -> Self {
        Self {
            provider,
            config,
        }
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    /// Answers `query_text` from `candidates`, degrading instead of failing.
    pub async fn synthesize(
        &self,
        query_text: &str,
        candidates: &[ScoredCandidate],
    ) -> SynthesisResult {
        let prepared = self.prepare(query_text, candidates);
        if prepared.is_empty() {
            return self.fallback(&prepared, DegradationReason::NoCandidates);
        }

        let outcome = self.generate(&prepared).await;
        self.finish(&prepared, outcome)
    }

    /// Builds the grounding context for `candidates`.
    pub fn prepare(&self, query_text: &str, candidates: &[ScoredCandidate]) -> PreparedSynthesis {
        let context = GroundingContext::build(
            candidates,
            self.config.max_context_chars,
            &self.config.context_metadata_keys,
        );
        if context.is_truncated() {
            tracing::debug!(
                max_context_chars = self.config.max_context_chars,
                "Top-ranked profile truncated to fit context"
            );
        }

        let labels = context
            .cited_experts()
            .iter()
            .filter_map(|id| candidates.iter().find(|c| c.id() == id))
            .map(|c| c.expert.label())
            .collect();

        PreparedSynthesis {
            query: query_text.trim().to_string(),
            context,
            labels,
        }
    }

    /// Calls the model once. Never retries.
    pub async fn generate(&self, prepared: &PreparedSynthesis) -> GenerationOutcome {
        let request = self.build_request(prepared);
        let result = self
            .provider
            .complete(&request)
            .await
            .map(|response| response.text);
        GenerationOutcome::from_response(result)
    }

    /// Converts a generation outcome into the final result.
    pub fn finish(&self, prepared: &PreparedSynthesis, outcome: GenerationOutcome) -> SynthesisResult {
        match outcome {
            GenerationOutcome::Success(text) => {
                tracing::debug!(
                    provider = self.provider.name(),
                    cited = prepared.cited_experts().len(),
                    "Generated answer"
                );
                SynthesisResult::generated(text, prepared.cited_experts().to_vec())
            }
            GenerationOutcome::Failure { kind, detail } => {
                tracing::warn!(
                    provider = self.provider.name(),
                    model = self.provider.model(),
                    %kind,
                    detail = %detail,
                    "Answer generation failed, returning fallback"
                );
                self.fallback(prepared, DegradationReason::GenerationFailed(kind))
            }
        }
    }

    /// Deterministic answer that lists the cited experts.
    pub fn fallback(&self, prepared: &PreparedSynthesis, reason: DegradationReason) -> SynthesisResult {
        if prepared.is_empty() {
            let text = match reason {
                DegradationReason::InvalidQuery => INVALID_QUERY_ANSWER,
                DegradationReason::RetrievalFailed => SEARCH_FAILED_ANSWER,
                DegradationReason::TimedOut => SEARCH_TIMED_OUT_ANSWER,
                _ => NO_EXPERTS_ANSWER,
            };
            return SynthesisResult::degraded(text, Vec::new(), reason);
        }

        let mut text = self.config.fallback_intro.clone();
        for (position, label) in prepared.labels.iter().enumerate() {
            text.push_str(&format!("\n{}. {}", position + 1, label));
        }
        SynthesisResult::degraded(text, prepared.cited_experts().to_vec(), reason)
    }

    fn build_request(&self, prepared: &PreparedSynthesis) -> CompletionRequest {
        let prompt = format!(
            "Question: {}\n\nExperts:\n{}\n\nWhich of these experts should be contacted, and why?",
            prepared.query,
            prepared.context.text()
        );

        CompletionRequest::new(vec![Message::user(prompt)])
            .with_system_prompt(self.config.system_prompt.clone())
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens)
    }
}
