//! Query pipeline: retrieval, then synthesis, under a single deadline.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use expert_finder::embedding::HashingEmbedder;
//! use expert_finder::index::ExpertIndex;
//! use expert_finder::pipeline::{Pipeline, QueryOptions};
//! use expert_finder::providers::ai::OllamaProvider;
//! use expert_finder::retrieval::Retriever;
//! use expert_finder::synthesis::AnswerSynthesizer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let index = Arc::new(ExpertIndex::open("experts.db").await?);
//! let retriever = Arc::new(Retriever::new(Arc::new(HashingEmbedder::default()), index));
//! let synthesizer = Arc::new(AnswerSynthesizer::new(Arc::new(OllamaProvider::llama3())));
//! let pipeline = Pipeline::new(retriever, synthesizer);
//!
//! let answer = pipeline
//!     .answer_query("who can advise on water sanitation?", &QueryOptions::new().top_k(3))
//!     .await?;
//! println!("{}", answer.answer_text);
//! # Ok(())
//! # }
//! ```

mod options;
mod orchestrator;

pub use options::{
    ConfigurationError, QueryOptions, QueryOutcome, Result, DEFAULT_TIMEOUT, DEFAULT_TOP_K,
};
pub use orchestrator::Pipeline;
