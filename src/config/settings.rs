//! Settings types and persistence.
//!
//! Settings are stored as JSON at `<config dir>/expert-finder/settings.json`
//! (or the platform equivalent) and loaded at startup. Every section has a
//! usable default, so a missing file or a partial file is fine.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::embedding::{
    known_dimension, CachedEmbedder, CandleEmbedder, Embedder, EmbeddingError, HashingEmbedder,
    ModelType, RemoteEmbedder, DEFAULT_HASHING_DIMENSION, DEFAULT_MAX_INPUT_CHARS,
    DEFAULT_REMOTE_MODEL,
};
use crate::index::DEFAULT_INDEX_NAME;
use crate::pipeline::QueryOptions;
use crate::providers::ai::{
    LlmError, LlmProvider, OllamaProvider, OpenAiCompatibleProvider, GROQ_BASE_URL,
    GROQ_DEFAULT_MODEL, OLLAMA_DEFAULT_URL, OPENAI_BASE_URL,
};
use crate::retrieval::RetrievalConfig;
use crate::synthesis::{SynthesisConfig, MIN_CONTEXT_CHARS};

const APPLICATION: &str = "expert-finder";
const SETTINGS_FILE: &str = "settings.json";
const DATABASE_FILE: &str = "experts.db";

/// Errors that can occur while loading or applying settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read or write settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid setting: {0}")]
    Invalid(String),

    #[error("Invalid URL for {field}: {source}")]
    Url {
        field: &'static str,
        source: url::ParseError,
    },

    #[error("Failed to initialize embedder: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Failed to initialize provider: {0}")]
    Provider(#[from] LlmError),

    #[error("No home directory available to derive default paths")]
    NoProjectDirs,
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

/// Top-level settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub embedding: EmbeddingSettings,
    pub index: IndexSettings,
    pub retrieval: RetrievalSettings,
    pub synthesis: SynthesisConfig,
    pub provider: ProviderSettings,
    pub pipeline: PipelineSettings,
}

impl Settings {
    /// Default location of the settings file.
    pub fn default_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join(SETTINGS_FILE))
    }

    /// Loads settings from `path`, falling back to defaults if it does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let settings = match std::fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No settings file, using defaults");
                Settings::default()
            }
            Err(e) => return Err(e.into()),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Writes settings to `path` as pretty JSON, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Checks values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        if self.embedding.dimension()? == 0 {
            return Err(SettingsError::Invalid(
                "embedding.dimension must be at least 1".to_string(),
            ));
        }
        if self.retrieval.pool_multiplier == 0 {
            return Err(SettingsError::Invalid(
                "retrieval.pool_multiplier must be at least 1".to_string(),
            ));
        }
        if self.synthesis.max_context_chars < MIN_CONTEXT_CHARS {
            return Err(SettingsError::Invalid(format!(
                "synthesis.max_context_chars must be at least {}",
                MIN_CONTEXT_CHARS
            )));
        }
        if let Some(ref base_url) = self.provider.base_url {
            url::Url::parse(base_url).map_err(|source| SettingsError::Url {
                field: "provider.base_url",
                source,
            })?;
        }
        if let Some(ref base_url) = self.embedding.base_url {
            url::Url::parse(base_url).map_err(|source| SettingsError::Url {
                field: "embedding.base_url",
                source,
            })?;
        }
        self.query_options()
            .validate()
            .map_err(|e| SettingsError::Invalid(e.to_string()))
    }

    /// Default per-query options.
    pub fn query_options(&self) -> QueryOptions {
        QueryOptions::new()
            .top_k(self.retrieval.top_k)
            .min_score(self.retrieval.min_score)
            .timeout(Duration::from_secs(self.pipeline.timeout_secs))
    }

    /// Index database path, defaulting to the platform data directory.
    pub fn index_path(&self) -> Result<PathBuf> {
        match self.index.path {
            Some(ref path) => Ok(path.clone()),
            None => Ok(project_dirs()?.data_dir().join(DATABASE_FILE)),
        }
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", APPLICATION).ok_or(SettingsError::NoProjectDirs)
}

/// Which embedder implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Local feature hashing, no model download.
    #[default]
    Hashing,
    /// Local sentence-transformer through Candle.
    Candle,
    /// OpenAI-compatible `/embeddings` endpoint.
    Remote,
}

/// Embedder configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub backend: EmbeddingBackend,
    /// Local model for the candle backend.
    pub model: ModelType,
    /// Model name sent to the remote backend.
    pub remote_model: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// Output dimension for the hashing and remote backends. When unset, the
    /// hashing backend uses its default and the remote backend uses the
    /// model's known dimension.
    pub dimension: Option<usize>,
    pub max_input_chars: usize,
    pub use_gpu: bool,
    /// Number of query embeddings kept in memory. Zero disables caching.
    pub cache_capacity: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Hashing,
            model: ModelType::default(),
            remote_model: DEFAULT_REMOTE_MODEL.to_string(),
            base_url: None,
            api_key: None,
            dimension: None,
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
            use_gpu: false,
            cache_capacity: 256,
        }
    }
}

impl EmbeddingSettings {
    /// Vector dimension the configured backend will produce.
    pub fn dimension(&self) -> Result<usize> {
        match self.backend {
            EmbeddingBackend::Hashing => Ok(self.dimension.unwrap_or(DEFAULT_HASHING_DIMENSION)),
            EmbeddingBackend::Candle => Ok(self.model.embedding_dim()),
            EmbeddingBackend::Remote => self
                .dimension
                .or_else(|| known_dimension(&self.remote_model))
                .ok_or_else(|| {
                    SettingsError::Invalid(format!(
                        "embedding.dimension is required for remote model `{}`",
                        self.remote_model
                    ))
                }),
        }
    }

    /// Constructs the configured embedder. Loading a candle model blocks
    /// while weights are fetched.
    pub fn build(&self) -> Result<Arc<dyn Embedder>> {
        let dimension = self.dimension()?;
        let embedder: Arc<dyn Embedder> = match self.backend {
            EmbeddingBackend::Hashing => Arc::new(
                HashingEmbedder::new(dimension).with_max_input_chars(self.max_input_chars),
            ),
            EmbeddingBackend::Candle => Arc::new(CandleEmbedder::load(self.model, self.use_gpu)?),
            EmbeddingBackend::Remote => Arc::new(
                RemoteEmbedder::new(
                    self.base_url.as_deref().unwrap_or(OLLAMA_DEFAULT_URL),
                    self.api_key.clone(),
                    self.remote_model.clone(),
                    dimension,
                )
                .with_max_input_chars(self.max_input_chars),
            ),
        };

        tracing::info!(
            embedder = embedder.name(),
            dimension = embedder.dimension(),
            "Embedder ready"
        );

        if self.cache_capacity == 0 {
            return Ok(embedder);
        }
        Ok(Arc::new(CachedEmbedder::new(embedder, self.cache_capacity)))
    }
}

/// Index storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    /// Database file. Defaults to the platform data directory.
    pub path: Option<PathBuf>,
    pub name: String,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            path: None,
            name: DEFAULT_INDEX_NAME.to_string(),
        }
    }
}

/// Retrieval defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub min_score: f32,
    pub pool_multiplier: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        let defaults = QueryOptions::default();
        Self {
            top_k: defaults.top_k,
            min_score: defaults.min_score,
            pool_multiplier: RetrievalConfig::default().pool_multiplier,
        }
    }
}

impl RetrievalSettings {
    pub fn config(&self) -> RetrievalConfig {
        RetrievalConfig {
            pool_multiplier: self.pool_multiplier,
        }
    }
}

/// Which generative model service to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Groq,
    OpenAi,
    Ollama,
    /// Any other OpenAI-compatible endpoint; requires `base_url`.
    Custom,
}

/// Generative model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    /// Overrides the provider's default endpoint.
    pub base_url: Option<String>,
    pub model: String,
    pub api_key: Option<String>,
    /// Per-request HTTP timeout in seconds.
    pub request_timeout_secs: u64,
    /// Overrides the model's known context length.
    pub context_length: Option<usize>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            kind: ProviderKind::Groq,
            base_url: None,
            model: GROQ_DEFAULT_MODEL.to_string(),
            api_key: None,
            request_timeout_secs: 60,
            context_length: None,
        }
    }
}

impl ProviderSettings {
    /// Constructs the configured provider.
    pub fn build(&self) -> Result<Arc<dyn LlmProvider>> {
        let timeout = Duration::from_secs(self.request_timeout_secs.max(1));

        let provider: Arc<dyn LlmProvider> = match self.kind {
            ProviderKind::Ollama => {
                let url = self.base_url.as_deref().unwrap_or(OLLAMA_DEFAULT_URL);
                Arc::new(OllamaProvider::with_url(url, self.model.clone()).with_timeout(timeout)?)
            }
            kind => {
                let base_url = match (kind, self.base_url.as_deref()) {
                    (_, Some(url)) => url,
                    (ProviderKind::Groq, None) => GROQ_BASE_URL,
                    (ProviderKind::OpenAi, None) => OPENAI_BASE_URL,
                    _ => {
                        return Err(SettingsError::Invalid(
                            "provider.base_url is required for a custom provider".to_string(),
                        ))
                    }
                };
                if matches!(kind, ProviderKind::Groq | ProviderKind::OpenAi)
                    && self.api_key.is_none()
                {
                    tracing::warn!(?kind, "No API key configured, requests will be rejected");
                }

                let mut provider = OpenAiCompatibleProvider::custom(
                    base_url,
                    self.api_key.clone(),
                    self.model.clone(),
                )
                .with_timeout(timeout)?;
                if let Some(length) = self.context_length {
                    provider = provider.with_context_length(length);
                }
                Arc::new(provider)
            }
        };

        Ok(provider)
    }
}

/// End-to-end query settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub timeout_secs: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            timeout_secs: crate::pipeline::DEFAULT_TIMEOUT.as_secs(),
        }
    }
}
