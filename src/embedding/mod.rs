//! Text embeddings.
//!
//! Every backend implements [`Embedder`]; the rest of the crate only sees the
//! trait, so backends are chosen once at startup and injected.
//!
//! # Backends
//!
//! - [`HashingEmbedder`] - deterministic bag-of-words vectors, no model needed
//! - [`CandleEmbedder`] - local sentence-transformers via Candle
//! - [`RemoteEmbedder`] - OpenAI-compatible `/embeddings` endpoint
//! - [`CachedEmbedder`] - LRU cache wrapper for any of the above
//!
//! # Example
//!
//! ```
//! use expert_finder::embedding::{Embedder, HashingEmbedder};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let embedder = HashingEmbedder::default();
//! let query = embedder.embed_query("who knows water sanitation").await?;
//! assert_eq!(query.dimension(), embedder.dimension());
//! # Ok(())
//! # }
//! ```

mod cache;
mod candle;
mod engine;
mod hashing;
mod models;
mod remote;

pub use self::candle::CandleEmbedder;
pub use cache::CachedEmbedder;
pub use engine::{Embedder, Embedding, EmbeddingError, Result};
pub use hashing::{HashingEmbedder, DEFAULT_HASHING_DIMENSION, DEFAULT_MAX_INPUT_CHARS};
pub use models::ModelType;
pub use remote::{known_dimension, RemoteEmbedder, DEFAULT_REMOTE_MODEL};
