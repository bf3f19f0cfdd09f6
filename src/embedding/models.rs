//! Embedding model definitions.
//!
//! Sentence-transformer checkpoints the local embedder knows how to load,
//! with their output dimension, sequence limit and prompt prefixes.

use serde::{Deserialize, Serialize};

/// Available embedding model types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    /// Multilingual MiniLM, covers Arabic and English profiles alike.
    #[default]
    MultilingualMiniLmL12V2,
    /// All-MiniLM-L6-v2, English only, fastest.
    AllMiniLmL6V2,
    /// BGE-Small, tuned for retrieval.
    BgeSmall,
    /// E5-Small, asymmetric query/passage search.
    E5Small,
}

impl ModelType {
    /// Returns the Hugging Face model ID.
    pub fn hf_model_id(&self) -> &'static str {
        match self {
            Self::MultilingualMiniLmL12V2 => {
                "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2"
            }
            Self::AllMiniLmL6V2 => "sentence-transformers/all-MiniLM-L6-v2",
            Self::BgeSmall => "BAAI/bge-small-en-v1.5",
            Self::E5Small => "intfloat/e5-small-v2",
        }
    }

    /// Returns the expected embedding dimension.
    pub fn embedding_dim(&self) -> usize {
        384
    }

    /// Returns the maximum sequence length in tokens.
    pub fn max_seq_length(&self) -> usize {
        match self {
            Self::MultilingualMiniLmL12V2 => 128,
            Self::AllMiniLmL6V2 => 256,
            Self::BgeSmall | Self::E5Small => 512,
        }
    }

    /// Prefix prepended to queries, if the model was trained with one.
    pub fn query_prefix(&self) -> Option<&'static str> {
        match self {
            Self::E5Small => Some("query: "),
            Self::BgeSmall => Some("Represent this sentence for searching relevant passages: "),
            _ => None,
        }
    }

    /// Prefix prepended to indexed documents, if the model was trained with one.
    pub fn document_prefix(&self) -> Option<&'static str> {
        match self {
            Self::E5Small => Some("passage: "),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_model_is_multilingual() {
        let model = ModelType::default();
        assert_eq!(
            model.hf_model_id(),
            "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2"
        );
        assert_eq!(model.embedding_dim(), 384);
        assert_eq!(model.max_seq_length(), 128);
        assert!(model.query_prefix().is_none());
    }

    #[test]
    fn e5_model_prefix() {
        let model = ModelType::E5Small;
        assert_eq!(model.query_prefix(), Some("query: "));
        assert_eq!(model.document_prefix(), Some("passage: "));
    }

    #[test]
    fn model_serialization() {
        let json = serde_json::to_string(&ModelType::BgeSmall).unwrap();
        assert_eq!(json, "\"bge_small\"");

        let deserialized: ModelType = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, ModelType::BgeSmall);
    }
}
