//! Expert directory management.
//!
//! Provides the ingestion and admin surface over the index:
//! - Registering experts (embedding their profile text)
//! - Bulk import from JSON
//! - Listing, lookup and removal
//! - Collection info

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::domain::{ExpertId, ExpertProfile, NewExpert};
use crate::embedding::{Embedder, EmbeddingError};
use crate::index::{ExpertIndex, IndexError, IndexInfo};

/// Errors that can occur during expert management.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Invalid expert: {0}")]
    Validation(String),

    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Failed to read import file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse import file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Outcome of a bulk import.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
    /// Ids of the experts that were stored.
    pub added: Vec<ExpertId>,
    /// Position in the input and error message of each rejected entry.
    pub failed: Vec<(usize, String)>,
}

/// Adds, lists and removes experts.
pub struct ExpertService {
    embedder: Arc<dyn Embedder>,
    index: Arc<ExpertIndex>,
}

impl ExpertService {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<ExpertIndex>) -> Self {
        Self { embedder, index }
    }

    pub fn index(&self) -> &Arc<ExpertIndex> {
        &self.index
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Pins the index to the embedder's dimension.
    ///
    /// Fails with [`IndexError::DimensionMismatch`] when the index was built
    /// with a different embedding model.
    pub async fn ensure_dimension(&self) -> Result<()> {
        self.index.pin_dimension(self.embedder.dimension()).await?;
        Ok(())
    }

    /// Embeds and stores a new expert, returning the stored profile.
    pub async fn add_expert(&self, expert: NewExpert) -> Result<ExpertProfile> {
        if expert.name.trim().is_empty() {
            return Err(ServiceError::Validation("name is empty".to_string()));
        }
        if expert.profile_text().is_empty() {
            return Err(ServiceError::Validation(
                "expertise and description are both empty".to_string(),
            ));
        }

        self.ensure_dimension().await?;
        let profile = expert.into_profile();
        self.reingest(profile.clone()).await?;

        tracing::info!(expert_id = %profile.id, name = %profile.display_name, "Added expert");
        Ok(profile)
    }

    /// Re-embeds `profile` and replaces any stored entry with the same id.
    pub async fn reingest(&self, profile: ExpertProfile) -> Result<()> {
        let vector = self.embedder.embed_document(&profile.profile_text).await?;
        self.index.upsert(profile, vector).await?;
        Ok(())
    }

    /// Adds each expert in turn. A rejected entry does not stop the import.
    pub async fn import(&self, experts: Vec<NewExpert>) -> ImportSummary {
        let mut summary = ImportSummary::default();
        for (position, expert) in experts.into_iter().enumerate() {
            match self.add_expert(expert).await {
                Ok(profile) => summary.added.push(profile.id),
                Err(e) => {
                    tracing::warn!(position, error = %e, "Skipping expert during import");
                    summary.failed.push((position, e.to_string()));
                }
            }
        }
        tracing::info!(
            added = summary.added.len(),
            failed = summary.failed.len(),
            "Import finished"
        );
        summary
    }

    /// Imports a JSON array of experts from `path`.
    pub async fn import_file(&self, path: impl AsRef<Path>) -> Result<ImportSummary> {
        let raw = tokio::fs::read_to_string(path.as_ref()).await?;
        let experts: Vec<NewExpert> = serde_json::from_str(&raw)?;
        Ok(self.import(experts).await)
    }

    /// All experts, sorted by name.
    pub async fn list(&self) -> Vec<ExpertProfile> {
        self.index.profiles().await
    }

    pub async fn get(&self, id: &ExpertId) -> Result<ExpertProfile> {
        Ok(self.index.get(id).await?)
    }

    /// Removes an expert. Returns whether it existed.
    pub async fn remove(&self, id: &ExpertId) -> Result<bool> {
        let removed = self.index.remove(id).await?;
        if removed {
            tracing::info!(expert_id = %id, "Removed expert");
        }
        Ok(removed)
    }

    /// Removes every expert. Returns how many were removed.
    pub async fn clear(&self) -> Result<usize> {
        Ok(self.index.clear().await?)
    }

    pub async fn info(&self) -> IndexInfo {
        self.index.info().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DESCRIPTION_KEY, EXPERTISE_KEY};
    use crate::embedding::HashingEmbedder;

    async fn service() -> ExpertService {
        let index = ExpertIndex::in_memory().await.unwrap();
        ExpertService::new(Arc::new(HashingEmbedder::default()), Arc::new(index))
    }

    #[tokio::test]
    async fn add_expert_stores_profile() {
        let service = service().await;

        let profile = service
            .add_expert(NewExpert::new("Jane Doe", "Hydrology", "Water systems engineer"))
            .await
            .unwrap();

        assert_eq!(profile.profile_text, "Hydrology Water systems engineer");
        assert_eq!(profile.metadata_text(EXPERTISE_KEY), Some("Hydrology"));
        assert_eq!(
            profile.metadata_text(DESCRIPTION_KEY),
            Some("Water systems engineer")
        );
        assert_eq!(service.get(&profile.id).await.unwrap(), profile);
        assert_eq!(service.info().await.count, 1);
    }

    #[tokio::test]
    async fn add_expert_rejects_blank_input() {
        let service = service().await;

        assert!(matches!(
            service.add_expert(NewExpert::new("  ", "Hydrology", "x")).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            service.add_expert(NewExpert::new("Jane", " ", "")).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(service.list().await.is_empty());
    }

    #[tokio::test]
    async fn adding_same_id_replaces() {
        let service = service().await;
        service
            .add_expert(NewExpert::new("Jane", "Hydrology", "v1").with_id("jane"))
            .await
            .unwrap();
        service
            .add_expert(NewExpert::new("Jane", "Hydrology", "v2").with_id("jane"))
            .await
            .unwrap();

        let all = service.list().await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].profile_text, "Hydrology v2");
    }

    #[tokio::test]
    async fn empty_index_takes_embedder_dimension() {
        let service = service().await;
        service.ensure_dimension().await.unwrap();
        assert_eq!(service.index().dimension().await, Some(384));
    }

    #[tokio::test]
    async fn add_expert_rejects_embedder_of_other_dimension() {
        let index = Arc::new(ExpertIndex::in_memory().await.unwrap());
        let original = ExpertService::new(Arc::new(HashingEmbedder::default()), index.clone());
        original
            .add_expert(NewExpert::new("Amal", "Hydrology", "Water"))
            .await
            .unwrap();

        let swapped = ExpertService::new(Arc::new(HashingEmbedder::new(8)), index);
        assert!(matches!(
            swapped.ensure_dimension().await,
            Err(ServiceError::Index(IndexError::DimensionMismatch {
                expected: 384,
                actual: 8
            }))
        ));
        assert!(matches!(
            swapped
                .add_expert(NewExpert::new("Basel", "Epidemiology", "Outbreaks"))
                .await,
            Err(ServiceError::Index(IndexError::DimensionMismatch { .. }))
        ));
        assert_eq!(swapped.list().await.len(), 1);
    }

    #[tokio::test]
    async fn import_continues_past_bad_entries() {
        let service = service().await;

        let summary = service
            .import(vec![
                NewExpert::new("Amal", "Hydrology", "Water"),
                NewExpert::new("", "Nothing", "Missing name"),
                NewExpert::new("Basel", "Epidemiology", "Outbreaks"),
            ])
            .await;

        assert_eq!(summary.added.len(), 2);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, 1);
    }

    #[tokio::test]
    async fn import_file_reads_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("experts.json");
        std::fs::write(
            &path,
            r#"[
                {"name": "Amal", "expertise": "Hydrology", "description": "Water"},
                {"name": "Basel", "expertise": "Epidemiology", "description": "Outbreaks",
                 "metadata": {"organization": "WHO"}}
            ]"#,
        )
        .unwrap();
        let service = service().await;

        let summary = service.import_file(&path).await.unwrap();

        assert_eq!(summary.added.len(), 2);
        let names: Vec<String> = service
            .list()
            .await
            .into_iter()
            .map(|p| p.display_name)
            .collect();
        assert_eq!(names, vec!["Amal", "Basel"]);
    }

    #[tokio::test]
    async fn import_file_rejects_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("experts.json");
        std::fs::write(&path, "{not json").unwrap();

        let result = service().await.import_file(&path).await;
        assert!(matches!(result, Err(ServiceError::Parse(_))));
    }

    #[tokio::test]
    async fn remove_and_clear() {
        let service = service().await;
        let a = service
            .add_expert(NewExpert::new("Amal", "Hydrology", "Water"))
            .await
            .unwrap();
        service
            .add_expert(NewExpert::new("Basel", "Epidemiology", "Outbreaks"))
            .await
            .unwrap();

        assert!(service.remove(&a.id).await.unwrap());
        assert!(!service.remove(&a.id).await.unwrap());
        assert!(matches!(
            service.get(&a.id).await,
            Err(ServiceError::Index(IndexError::NotFound(_)))
        ));

        assert_eq!(service.clear().await.unwrap(), 1);
        assert!(service.list().await.is_empty());
    }
}
