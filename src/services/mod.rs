//! Business services layer.
//!
//! Services orchestrate domain operations across the embedder and the index.
//!
//! ```text
//!  CLI / request layer
//!          |
//!          v
//!    Services Layer  <-- You are here
//!          |
//!          v
//! Embedding, Index, Storage
//! ```
//!
//! - [`ExpertService`]: registers, imports, lists and removes experts

mod expert_service;

pub use expert_service::{ExpertService, ImportSummary, Result, ServiceError};
