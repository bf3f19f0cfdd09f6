//! Expert vector index.
//!
//! [`ExpertIndex`] stores expert profiles with their embeddings and answers
//! k-nearest-neighbor queries by cosine similarity. It is shared across
//! requests behind an `Arc`; reads run concurrently, writes are serialized.

mod expert_index;

pub use expert_index::{ExpertIndex, IndexError, IndexInfo, Result, DEFAULT_INDEX_NAME};
