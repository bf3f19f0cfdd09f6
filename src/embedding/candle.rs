//! Local transformer embeddings via Candle.
//!
//! Loads a BERT-family sentence-transformer from the Hugging Face hub (cached
//! on disk after the first download) and produces mean-pooled, L2-normalized
//! sentence vectors. Inference is CPU-bound and runs on the blocking pool.

use std::fmt::Display;
use std::sync::Arc;

use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use hf_hub::api::sync::Api;
use hf_hub::{Repo, RepoType};
use tokenizers::Tokenizer;

use super::engine::{Embedder, Embedding, EmbeddingError, Result};
use super::models::ModelType;

fn model_err<E: Display>(e: E) -> EmbeddingError {
    EmbeddingError::Model(e.to_string())
}

struct LoadedModel {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
}

/// Sentence-transformer embedder running locally.
///
/// Cloning shares the loaded weights.
#[derive(Clone)]
pub struct CandleEmbedder {
    model_type: ModelType,
    inner: Arc<LoadedModel>,
}

impl CandleEmbedder {
    /// Downloads (or reuses cached) weights and loads the model.
    ///
    /// This blocks on network and disk I/O; call it from a blocking context.
    pub fn load(model_type: ModelType, use_gpu: bool) -> Result<Self> {
        let device = if use_gpu {
            Device::cuda_if_available(0).map_err(model_err)?
        } else {
            Device::Cpu
        };

        tracing::info!(model_id = model_type.hf_model_id(), "Loading embedding model");

        let api = Api::new().map_err(model_err)?;
        let repo = api.repo(Repo::with_revision(
            model_type.hf_model_id().to_string(),
            RepoType::Model,
            "main".to_string(),
        ));
        let config_path = repo.get("config.json").map_err(model_err)?;
        let tokenizer_path = repo.get("tokenizer.json").map_err(model_err)?;
        let weights_path = repo.get("model.safetensors").map_err(model_err)?;

        let config: Config =
            serde_json::from_str(&std::fs::read_to_string(config_path).map_err(model_err)?)
                .map_err(model_err)?;

        let mut tokenizer = Tokenizer::from_file(tokenizer_path).map_err(model_err)?;
        // Overlong input must be reported, not silently cut.
        tokenizer.with_padding(None);
        tokenizer.with_truncation(None).map_err(model_err)?;

        // SAFETY: the safetensors file is owned by the hub cache and is not
        // modified while mapped.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, &device)
                .map_err(model_err)?
        };
        let model = BertModel::load(vb, &config).map_err(model_err)?;

        Ok(Self {
            model_type,
            inner: Arc::new(LoadedModel {
                model,
                tokenizer,
                device,
            }),
        })
    }

    pub fn model_type(&self) -> ModelType {
        self.model_type
    }

    async fn embed_with_prefix(&self, prefix: Option<&str>, text: &str) -> Result<Embedding> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let input = match prefix {
            Some(p) => format!("{}{}", p, text),
            None => text.to_string(),
        };
        let inner = self.inner.clone();
        let max = self.model_type.max_seq_length();

        tokio::task::spawn_blocking(move || embed_blocking(&inner, &input, max))
            .await
            .map_err(model_err)?
    }
}

fn embed_blocking(inner: &LoadedModel, text: &str, max_tokens: usize) -> Result<Embedding> {
    let encoding = inner.tokenizer.encode(text, true).map_err(model_err)?;
    let ids = encoding.get_ids();
    if ids.len() > max_tokens {
        return Err(EmbeddingError::InputTooLong {
            length: ids.len(),
            max: max_tokens,
        });
    }

    let input_ids = Tensor::new(ids, &inner.device)
        .and_then(|t| t.unsqueeze(0))
        .map_err(model_err)?;
    let token_type_ids = input_ids.zeros_like().map_err(model_err)?;
    let attention_mask = Tensor::new(encoding.get_attention_mask(), &inner.device)
        .and_then(|t| t.unsqueeze(0))
        .map_err(model_err)?;

    let hidden = inner
        .model
        .forward(&input_ids, &token_type_ids, Some(&attention_mask))
        .map_err(model_err)?;

    // Mean pooling over tokens; a single unpadded sequence needs no masking.
    let (_batch, n_tokens, _hidden) = hidden.dims3().map_err(model_err)?;
    let pooled = hidden
        .sum(1)
        .and_then(|t| t / (n_tokens as f64))
        .and_then(|t| t.squeeze(0))
        .and_then(|t| t.to_dtype(DType::F32))
        .and_then(|t| t.to_vec1::<f32>())
        .map_err(model_err)?;

    Embedding::new(pooled)
        .normalized()
        .ok_or_else(|| EmbeddingError::Model("model produced a degenerate vector".into()))
}

#[async_trait]
impl Embedder for CandleEmbedder {
    fn name(&self) -> &str {
        "candle"
    }

    fn dimension(&self) -> usize {
        self.model_type.embedding_dim()
    }

    fn max_input_length(&self) -> usize {
        self.model_type.max_seq_length()
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        self.embed_with_prefix(None, text).await
    }

    async fn embed_query(&self, text: &str) -> Result<Embedding> {
        self.embed_with_prefix(self.model_type.query_prefix(), text)
            .await
    }

    async fn embed_document(&self, text: &str) -> Result<Embedding> {
        self.embed_with_prefix(self.model_type.document_prefix(), text)
            .await
    }
}
