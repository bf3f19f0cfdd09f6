//! Vector index of expert profiles.
//!
//! Holds every profile with its unit-length embedding in memory for
//! brute-force cosine search, and mirrors each write to SQLite so the index
//! survives restarts. A write reaches the database first and the in-memory
//! snapshot second; entries are swapped in as whole `Arc`s, so a concurrent
//! reader sees an entry either entirely before or entirely after an upsert.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

use crate::domain::{ExpertId, ExpertProfile};
use crate::embedding::Embedding;
use crate::storage::queries::experts::{self, StoredExpert};
use crate::storage::{Database, DatabaseError};

/// Metadata key under which the established dimension is persisted.
const DIMENSION_META_KEY: &str = "dimension";

/// Default collection name.
pub const DEFAULT_INDEX_NAME: &str = "experts";

/// Errors that can occur during index operations.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Query size must be at least 1")]
    InvalidK,

    #[error("Vector dimension mismatch: index uses {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Vector is empty, zero-length or contains non-finite values")]
    InvalidVector,

    #[error("Expert not found: {0}")]
    NotFound(ExpertId),

    #[error("Index data is corrupt: {0}")]
    Corrupt(String),

    #[error("Storage error: {0}")]
    Storage(DatabaseError),
}

impl From<DatabaseError> for IndexError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Corrupt(msg) => IndexError::Corrupt(msg),
            other => IndexError::Storage(other),
        }
    }
}

/// Result type for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;

/// Summary of the index contents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexInfo {
    pub name: String,
    pub count: usize,
    pub dimension: Option<usize>,
    pub metric: &'static str,
    pub path: Option<PathBuf>,
}

#[derive(Debug)]
struct IndexEntry {
    profile: ExpertProfile,
    /// Unit-length vector.
    vector: Embedding,
}

#[derive(Debug, Default)]
struct IndexState {
    dimension: Option<usize>,
    entries: HashMap<ExpertId, Arc<IndexEntry>>,
}

impl IndexState {
    fn check_dimension(&self, actual: usize) -> Result<()> {
        match self.dimension {
            Some(expected) if expected != actual => {
                Err(IndexError::DimensionMismatch { expected, actual })
            }
            _ => Ok(()),
        }
    }
}

/// Persistent expert index with cosine k-nearest-neighbor search.
#[derive(Debug)]
pub struct ExpertIndex {
    name: String,
    path: Option<PathBuf>,
    db: Database,
    state: RwLock<IndexState>,
    /// Serializes writers so database order matches snapshot order.
    write_lock: Mutex<()>,
}

impl ExpertIndex {
    /// Opens (or creates) the index stored at `path` and loads it into memory.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let db = Database::open(&path).await?;
        let index = Self::load(db, Some(path)).await?;
        let count = index.len().await;
        tracing::info!(name = %index.name, count, "Opened expert index");
        Ok(index)
    }

    /// Creates an empty index backed by an in-memory database.
    pub async fn in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Self::load(db, None).await
    }

    /// Overrides the collection name reported by [`info`](Self::info).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    async fn load(db: Database, path: Option<PathBuf>) -> Result<Self> {
        let (rows, stored_dimension) = db
            .with_conn(|conn| {
                let rows = experts::get_all(conn)?;
                let dimension = experts::get_meta(conn, DIMENSION_META_KEY)?;
                Ok((rows, dimension))
            })
            .await?;

        let mut dimension = match stored_dimension {
            Some(raw) => Some(raw.parse::<usize>().map_err(|_| {
                IndexError::Corrupt(format!("stored dimension '{}' is not a number", raw))
            })?),
            None => None,
        };

        let mut entries = HashMap::with_capacity(rows.len());
        for row in rows {
            let expected = *dimension.get_or_insert(row.embedding.len());
            if row.embedding.len() != expected {
                return Err(IndexError::Corrupt(format!(
                    "expert {} has dimension {}, index uses {}",
                    row.profile.id,
                    row.embedding.len(),
                    expected
                )));
            }
            let vector = Embedding::new(row.embedding)
                .normalized()
                .ok_or_else(|| {
                    IndexError::Corrupt(format!("expert {} has a degenerate vector", row.profile.id))
                })?;
            entries.insert(
                row.profile.id.clone(),
                Arc::new(IndexEntry {
                    profile: row.profile,
                    vector,
                }),
            );
        }

        Ok(Self {
            name: DEFAULT_INDEX_NAME.to_string(),
            path,
            db,
            state: RwLock::new(IndexState { dimension, entries }),
            write_lock: Mutex::new(()),
        })
    }

    /// Fixes the index dimension ahead of the first upsert.
    ///
    /// Fails if the index already uses a different dimension, which happens
    /// when the embedding model changed since the index was built.
    pub async fn pin_dimension(&self, dimension: usize) -> Result<()> {
        if dimension == 0 {
            return Err(IndexError::InvalidVector);
        }

        let _guard = self.write_lock.lock().await;
        if let Some(expected) = self.state.read().await.dimension {
            if expected != dimension {
                return Err(IndexError::DimensionMismatch {
                    expected,
                    actual: dimension,
                });
            }
            return Ok(());
        }

        self.db
            .with_conn(move |conn| {
                experts::set_meta(conn, DIMENSION_META_KEY, &dimension.to_string())
            })
            .await?;
        self.state.write().await.dimension = Some(dimension);
        Ok(())
    }

    /// Inserts or replaces the entry for `profile.id`.
    ///
    /// Re-upserting an id overwrites its profile and vector; it never creates
    /// a second entry.
    pub async fn upsert(&self, profile: ExpertProfile, vector: Embedding) -> Result<()> {
        let vector = vector.normalized().ok_or(IndexError::InvalidVector)?;
        let dimension = vector.dimension();

        let _guard = self.write_lock.lock().await;
        let first_write = {
            let state = self.state.read().await;
            state.check_dimension(dimension)?;
            state.dimension.is_none()
        };

        let stored = StoredExpert {
            profile: profile.clone(),
            embedding: vector.values.clone(),
        };
        self.db
            .transaction(move |tx| {
                experts::upsert(tx, &stored)?;
                if first_write {
                    experts::set_meta(tx, DIMENSION_META_KEY, &dimension.to_string())?;
                }
                Ok(())
            })
            .await?;

        let id = profile.id.clone();
        let mut state = self.state.write().await;
        state.dimension.get_or_insert(dimension);
        state
            .entries
            .insert(id.clone(), Arc::new(IndexEntry { profile, vector }));
        drop(state);

        tracing::debug!(expert_id = %id, dimension, "Upserted expert");
        Ok(())
    }

    /// Returns up to `k` experts most similar to `vector`.
    ///
    /// Results are sorted by descending cosine similarity, ties broken by
    /// ascending expert id. An empty index yields an empty list.
    pub async fn query(&self, vector: &Embedding, k: usize) -> Result<Vec<(ExpertId, f32)>> {
        if k == 0 {
            return Err(IndexError::InvalidK);
        }

        let state = self.state.read().await;
        if state.entries.is_empty() {
            return Ok(Vec::new());
        }
        state.check_dimension(vector.dimension())?;
        let query = vector.normalized().ok_or(IndexError::InvalidVector)?;

        let mut scores: Vec<(ExpertId, f32)> = state
            .entries
            .values()
            .map(|entry| {
                let score = query.dot(&entry.vector).clamp(-1.0, 1.0);
                (entry.profile.id.clone(), score)
            })
            .collect();
        drop(state);

        scores.sort_by(compare_scored);
        scores.truncate(k);
        Ok(scores)
    }

    /// Gets a profile by id.
    pub async fn get(&self, id: &ExpertId) -> Result<ExpertProfile> {
        self.state
            .read()
            .await
            .entries
            .get(id)
            .map(|entry| entry.profile.clone())
            .ok_or_else(|| IndexError::NotFound(id.clone()))
    }

    /// Returns whether an entry exists for `id`.
    pub async fn contains(&self, id: &ExpertId) -> bool {
        self.state.read().await.entries.contains_key(id)
    }

    /// Removes an entry. Returns whether it existed.
    pub async fn remove(&self, id: &ExpertId) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let key = id.as_str().to_string();
        self.db
            .with_conn(move |conn| experts::delete(conn, &key))
            .await?;
        let removed = self.state.write().await.entries.remove(id).is_some();
        if removed {
            tracing::debug!(expert_id = %id, "Removed expert");
        }
        Ok(removed)
    }

    /// Removes every entry. The established dimension is kept.
    pub async fn clear(&self) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        self.db.with_conn(experts::delete_all).await?;
        let mut state = self.state.write().await;
        let removed = state.entries.len();
        state.entries.clear();
        tracing::info!(removed, "Cleared expert index");
        Ok(removed)
    }

    /// Returns the number of entries.
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    /// Returns whether the index is empty.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }

    /// Returns the established vector dimension, if any vector was stored.
    pub async fn dimension(&self) -> Option<usize> {
        self.state.read().await.dimension
    }

    /// Returns all profiles sorted by display name, then id.
    pub async fn profiles(&self) -> Vec<ExpertProfile> {
        let mut profiles: Vec<ExpertProfile> = self
            .state
            .read()
            .await
            .entries
            .values()
            .map(|entry| entry.profile.clone())
            .collect();
        profiles.sort_by(|a, b| {
            a.display_name
                .cmp(&b.display_name)
                .then_with(|| a.id.cmp(&b.id))
        });
        profiles
    }

    /// Returns a summary of the index.
    pub async fn info(&self) -> IndexInfo {
        let state = self.state.read().await;
        IndexInfo {
            name: self.name.clone(),
            count: state.entries.len(),
            dimension: state.dimension,
            metric: "cosine",
            path: self.path.clone(),
        }
    }
}

/// Descending score, then ascending id.
fn compare_scored(a: &(ExpertId, f32), b: &(ExpertId, f32)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(id: &str) -> ExpertProfile {
        ExpertProfile::new(id, format!("Expert {}", id), format!("profile of {}", id))
    }

    fn vector(values: &[f32]) -> Embedding {
        Embedding::new(values.to_vec())
    }

    #[tokio::test]
    async fn upsert_and_get_roundtrip() {
        let index = ExpertIndex::in_memory().await.unwrap();
        let p = profile("a").with_metadata("organization", "WHO");

        index.upsert(p.clone(), vector(&[1.0, 0.0])).await.unwrap();

        assert_eq!(index.get(&ExpertId::from("a")).await.unwrap(), p);
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let index = ExpertIndex::in_memory().await.unwrap();
        assert!(matches!(
            index.get(&ExpertId::from("ghost")).await,
            Err(IndexError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn upsert_overwrites_instead_of_duplicating() {
        let index = ExpertIndex::in_memory().await.unwrap();
        index.upsert(profile("a"), vector(&[1.0, 0.0])).await.unwrap();
        index.upsert(profile("a"), vector(&[0.0, 1.0])).await.unwrap();

        assert_eq!(index.len().await, 1);
        let results = index.query(&vector(&[0.0, 1.0]), 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!((results[0].1 - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn repeated_identical_upsert_leaves_results_unchanged() {
        let index = ExpertIndex::in_memory().await.unwrap();
        index.upsert(profile("a"), vector(&[1.0, 0.2])).await.unwrap();
        index.upsert(profile("b"), vector(&[0.3, 1.0])).await.unwrap();

        let query = vector(&[1.0, 1.0]);
        let before = index.query(&query, 10).await.unwrap();
        index.upsert(profile("a"), vector(&[1.0, 0.2])).await.unwrap();
        let after = index.query(&query, 10).await.unwrap();

        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn query_sorts_descending_and_respects_k() {
        let index = ExpertIndex::in_memory().await.unwrap();
        index.upsert(profile("exact"), vector(&[1.0, 0.0])).await.unwrap();
        index.upsert(profile("similar"), vector(&[0.9, 0.1])).await.unwrap();
        index.upsert(profile("different"), vector(&[0.0, 1.0])).await.unwrap();

        let results = index.query(&vector(&[1.0, 0.0]), 2).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, ExpertId::from("exact"));
        assert_eq!(results[1].0, ExpertId::from("similar"));
        assert!(results[0].1 >= results[1].1);
    }

    #[tokio::test]
    async fn ties_break_by_ascending_id() {
        let index = ExpertIndex::in_memory().await.unwrap();
        for id in ["charlie", "alpha", "bravo"] {
            index.upsert(profile(id), vector(&[1.0, 0.0])).await.unwrap();
        }

        let ids: Vec<String> = index
            .query(&vector(&[1.0, 0.0]), 3)
            .await
            .unwrap()
            .into_iter()
            .map(|(id, _)| id.0)
            .collect();
        assert_eq!(ids, vec!["alpha", "bravo", "charlie"]);
    }

    #[tokio::test]
    async fn empty_index_returns_empty() {
        let index = ExpertIndex::in_memory().await.unwrap();
        let results = index.query(&vector(&[1.0, 0.0]), 5).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn zero_k_is_an_error() {
        let index = ExpertIndex::in_memory().await.unwrap();
        assert!(matches!(
            index.query(&vector(&[1.0]), 0).await,
            Err(IndexError::InvalidK)
        ));
    }

    #[tokio::test]
    async fn mismatched_dimension_is_rejected() {
        let index = ExpertIndex::in_memory().await.unwrap();
        index.upsert(profile("a"), vector(&[1.0, 0.0])).await.unwrap();

        assert!(matches!(
            index.upsert(profile("b"), vector(&[1.0, 0.0, 0.0])).await,
            Err(IndexError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
        assert!(matches!(
            index.query(&vector(&[1.0]), 1).await,
            Err(IndexError::DimensionMismatch { .. })
        ));
        assert!(!index.contains(&ExpertId::from("b")).await);
    }

    #[tokio::test]
    async fn zero_vector_is_rejected() {
        let index = ExpertIndex::in_memory().await.unwrap();
        assert!(matches!(
            index.upsert(profile("a"), vector(&[0.0, 0.0])).await,
            Err(IndexError::InvalidVector)
        ));
        assert!(index.is_empty().await);
    }

    #[tokio::test]
    async fn pin_dimension_guards_model_changes() {
        let index = ExpertIndex::in_memory().await.unwrap();
        index.pin_dimension(3).await.unwrap();
        index.pin_dimension(3).await.unwrap();

        assert!(matches!(
            index.pin_dimension(4).await,
            Err(IndexError::DimensionMismatch {
                expected: 3,
                actual: 4
            })
        ));
        assert!(index.upsert(profile("a"), vector(&[1.0, 0.0])).await.is_err());
    }

    #[tokio::test]
    async fn remove_and_clear() {
        let index = ExpertIndex::in_memory().await.unwrap();
        index.upsert(profile("a"), vector(&[1.0, 0.0])).await.unwrap();
        index.upsert(profile("b"), vector(&[0.0, 1.0])).await.unwrap();

        assert!(index.remove(&ExpertId::from("a")).await.unwrap());
        assert!(!index.remove(&ExpertId::from("a")).await.unwrap());
        assert_eq!(index.clear().await.unwrap(), 1);
        assert!(index.is_empty().await);
        assert_eq!(index.dimension().await, Some(2));
    }

    #[tokio::test]
    async fn profiles_are_sorted_by_name() {
        let index = ExpertIndex::in_memory().await.unwrap();
        index
            .upsert(ExpertProfile::new("1", "Zaid", "x"), vector(&[1.0]))
            .await
            .unwrap();
        index
            .upsert(ExpertProfile::new("2", "Amal", "y"), vector(&[1.0]))
            .await
            .unwrap();

        let names: Vec<String> = index
            .profiles()
            .await
            .into_iter()
            .map(|p| p.display_name)
            .collect();
        assert_eq!(names, vec!["Amal", "Zaid"]);
    }

    #[tokio::test]
    async fn info_reports_collection() {
        let index = ExpertIndex::in_memory().await.unwrap().with_name("gaza-experts");
        index.upsert(profile("a"), vector(&[1.0, 0.0, 0.0])).await.unwrap();

        let info = index.info().await;
        assert_eq!(info.name, "gaza-experts");
        assert_eq!(info.count, 1);
        assert_eq!(info.dimension, Some(3));
        assert_eq!(info.metric, "cosine");
        assert!(info.path.is_none());
    }

    #[tokio::test]
    async fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("experts.db");

        {
            let index = ExpertIndex::open(&path).await.unwrap();
            index
                .upsert(profile("a").with_metadata("tags", "water"), vector(&[1.0, 0.0]))
                .await
                .unwrap();
            index.upsert(profile("b"), vector(&[0.0, 2.0])).await.unwrap();
            index.remove(&ExpertId::from("b")).await.unwrap();
        }

        let reopened = ExpertIndex::open(&path).await.unwrap();
        assert_eq!(reopened.len().await, 1);
        assert_eq!(reopened.dimension().await, Some(2));
        assert_eq!(
            reopened.get(&ExpertId::from("a")).await.unwrap().metadata_text("tags"),
            Some("water")
        );
        assert!(matches!(
            reopened.upsert(profile("c"), vector(&[1.0, 0.0, 0.0])).await,
            Err(IndexError::DimensionMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn concurrent_readers_see_whole_entries() {
        let index = Arc::new(ExpertIndex::in_memory().await.unwrap());
        index.upsert(profile("a"), vector(&[1.0, 0.0])).await.unwrap();

        let writer = {
            let index = index.clone();
            tokio::spawn(async move {
                for i in 0..50 {
                    let v = if i % 2 == 0 { [0.0, 1.0] } else { [1.0, 0.0] };
                    index.upsert(profile("a"), vector(&v)).await.unwrap();
                }
            })
        };

        let mut readers = Vec::new();
        for _ in 0..8 {
            let index = index.clone();
            readers.push(tokio::spawn(async move {
                for _ in 0..50 {
                    let results = index.query(&vector(&[1.0, 0.0]), 5).await.unwrap();
                    assert_eq!(results.len(), 1);
                    let score = results[0].1;
                    // Only the two whole vectors ever exist.
                    assert!(score.abs() < 1e-6 || (score - 1.0).abs() < 1e-6);
                }
            }));
        }

        writer.await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }
    }
}
