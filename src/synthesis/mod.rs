//! Answer synthesis from ranked experts.
//!
//! [`GroundingContext`] renders candidates into a bounded prompt section;
//! [`AnswerSynthesizer`] asks the generative model for an answer and falls
//! back to a plain listing of the experts when the model cannot deliver.

mod context;
mod synthesizer;

pub use context::{GroundingContext, TRUNCATION_MARKER};
pub use synthesizer::{
    failure_kind, AnswerSynthesizer, GenerationOutcome, PreparedSynthesis, SynthesisConfig,
    INVALID_QUERY_ANSWER, MIN_CONTEXT_CHARS, NO_EXPERTS_ANSWER, SEARCH_FAILED_ANSWER,
    SEARCH_TIMED_OUT_ANSWER,
};
