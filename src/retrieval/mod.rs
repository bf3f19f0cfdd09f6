//! Candidate retrieval: query text in, ranked experts out.

mod filter;
mod retriever;

pub use filter::ExpertFilter;
pub use retriever::{RetrievalConfig, RetrievalError, RetrievalRequest, Result, Retriever};
