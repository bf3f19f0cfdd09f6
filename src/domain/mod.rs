//! Domain layer types for the expert finder.
//!
//! Expert profiles and their identifiers, plus the transient per-query types
//! (ranked candidates, synthesized answers) that flow through the pipeline.

mod answer;
mod expert;
mod types;

pub use answer::{DegradationReason, GenerationFailureKind, ScoredCandidate, SynthesisResult};
pub use expert::{
    ExpertProfile, Metadata, MetadataValue, NewExpert, DESCRIPTION_KEY, EXPERTISE_KEY,
    ORGANIZATION_KEY, TAGS_KEY,
};
pub use types::ExpertId;
