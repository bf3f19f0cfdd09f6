//! Retrieval followed by synthesis under one deadline.

use std::sync::Arc;
use std::time::Instant;

use tokio::time::timeout_at;

use crate::domain::{DegradationReason, ScoredCandidate, SynthesisResult};
use crate::retrieval::Retriever;
use crate::synthesis::AnswerSynthesizer;

use super::options::{ConfigurationError, QueryOptions, QueryOutcome, Result};

/// Answers queries end to end.
///
/// Holds its collaborators behind `Arc`s so a single pipeline can serve any
/// number of concurrent queries.
pub struct Pipeline {
    retriever: Arc<Retriever>,
    synthesizer: Arc<AnswerSynthesizer>,
}

impl Pipeline {
    pub fn new(retriever: Arc<Retriever>, synthesizer: Arc<AnswerSynthesizer>) -> Self {
        Self {
            retriever,
            synthesizer,
        }
    }

    pub fn retriever(&self) -> &Arc<Retriever> {
        &self.retriever
    }

    pub fn synthesizer(&self) -> &Arc<AnswerSynthesizer> {
        &self.synthesizer
    }

    /// Answers `query_text`. Only invalid options are errors.
    pub async fn answer_query(
        &self,
        query_text: &str,
        options: &QueryOptions,
    ) -> Result<SynthesisResult> {
        Ok(self
            .answer_query_detailed(query_text, options)
            .await?
            .synthesis)
    }

    /// Like [`answer_query`](Self::answer_query), also returning the ranked
    /// candidates and the elapsed time.
    pub async fn answer_query_detailed(
        &self,
        query_text: &str,
        options: &QueryOptions,
    ) -> Result<QueryOutcome> {
        let query = query_text.trim();
        if query.is_empty() {
            return Err(ConfigurationError::EmptyQuery);
        }
        options.validate()?;

        let started = Instant::now();
        let deadline = tokio::time::Instant::now() + options.timeout;
        let request = options.retrieval_request();

        let candidates =
            match timeout_at(deadline, self.retriever.retrieve_with(query, &request)).await {
                Ok(Ok(candidates)) => candidates,
                Ok(Err(e)) => {
                    let reason = if e.is_invalid_query() {
                        tracing::info!(error = %e, "Query rejected by embedder");
                        DegradationReason::InvalidQuery
                    } else {
                        tracing::warn!(error = %e, "Retrieval failed, returning fallback");
                        DegradationReason::RetrievalFailed
                    };
                    let prepared = self.synthesizer.prepare(query, &[]);
                    let synthesis = self.synthesizer.fallback(&prepared, reason);
                    return Ok(outcome(synthesis, Vec::new(), started));
                }
                Err(_) => {
                    tracing::warn!(
                        timeout_ms = options.timeout.as_millis() as u64,
                        "Deadline reached during retrieval"
                    );
                    let prepared = self.synthesizer.prepare(query, &[]);
                    let synthesis = self
                        .synthesizer
                        .fallback(&prepared, DegradationReason::TimedOut);
                    return Ok(outcome(synthesis, Vec::new(), started));
                }
            };

        let prepared = self.synthesizer.prepare(query, &candidates);
        if prepared.is_empty() {
            let synthesis = self
                .synthesizer
                .fallback(&prepared, DegradationReason::NoCandidates);
            return Ok(outcome(synthesis, candidates, started));
        }

        // Dropping the timed-out future cancels the in-flight provider call.
        let synthesis = match timeout_at(deadline, self.synthesizer.generate(&prepared)).await {
            Ok(generation) => self.synthesizer.finish(&prepared, generation),
            Err(_) => {
                tracing::warn!(
                    timeout_ms = options.timeout.as_millis() as u64,
                    cited = prepared.cited_experts().len(),
                    "Deadline reached during generation"
                );
                self.synthesizer
                    .fallback(&prepared, DegradationReason::TimedOut)
            }
        };

        Ok(outcome(synthesis, candidates, started))
    }
}

fn outcome(
    synthesis: SynthesisResult,
    candidates: Vec<ScoredCandidate>,
    started: Instant,
) -> QueryOutcome {
    let elapsed = started.elapsed();
    tracing::info!(
        elapsed_ms = elapsed.as_millis() as u64,
        candidates = candidates.len(),
        degraded = synthesis.degraded,
        "Answered query"
    );
    QueryOutcome {
        synthesis,
        candidates,
        elapsed,
    }
}
