//! Configuration and settings management.
//!
//! Settings are stored in the user's config directory as JSON and turned into
//! the embedder, provider and query defaults at startup.

mod settings;

pub use settings::{
    EmbeddingBackend, EmbeddingSettings, IndexSettings, PipelineSettings, ProviderKind,
    ProviderSettings, Result, RetrievalSettings, Settings, SettingsError,
};
