//! Expert database queries.
//!
//! CRUD operations for expert profiles and their embedding vectors.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::domain::{ExpertId, ExpertProfile, Metadata};
use crate::storage::{DatabaseError, Result};

/// An expert profile together with its stored vector.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredExpert {
    pub profile: ExpertProfile,
    pub embedding: Vec<f32>,
}

/// Columns as read from SQLite, before validation.
struct RawRow {
    id: String,
    display_name: String,
    profile_text: String,
    metadata_json: String,
    embedding: Vec<u8>,
    dimension: i64,
}

const SELECT_COLUMNS: &str =
    "SELECT id, display_name, profile_text, metadata_json, embedding, dimension FROM experts";

/// Packs a vector as little-endian `f32` bytes.
pub fn encode_vector(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Unpacks a little-endian `f32` blob, checking it holds exactly `dimension` values.
pub fn decode_vector(bytes: &[u8], dimension: usize) -> Option<Vec<f32>> {
    if bytes.len() != dimension.checked_mul(4)? {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    )
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        id: row.get(0)?,
        display_name: row.get(1)?,
        profile_text: row.get(2)?,
        metadata_json: row.get(3)?,
        embedding: row.get(4)?,
        dimension: row.get(5)?,
    })
}

fn decode_row(raw: RawRow) -> Result<StoredExpert> {
    let metadata: Metadata = serde_json::from_str(&raw.metadata_json).map_err(|e| {
        DatabaseError::Corrupt(format!("expert {}: bad metadata: {}", raw.id, e))
    })?;

    let dimension = usize::try_from(raw.dimension)
        .map_err(|_| DatabaseError::Corrupt(format!("expert {}: negative dimension", raw.id)))?;
    let embedding = decode_vector(&raw.embedding, dimension).ok_or_else(|| {
        DatabaseError::Corrupt(format!(
            "expert {}: embedding blob of {} bytes does not hold {} values",
            raw.id,
            raw.embedding.len(),
            dimension
        ))
    })?;

    Ok(StoredExpert {
        profile: ExpertProfile {
            id: ExpertId(raw.id),
            display_name: raw.display_name,
            profile_text: raw.profile_text,
            metadata,
        },
        embedding,
    })
}

/// Inserts or replaces an expert by id. `created_at` survives replacement.
pub fn upsert(conn: &Connection, expert: &StoredExpert) -> Result<()> {
    let metadata_json = serde_json::to_string(&expert.profile.metadata)
        .map_err(|e| DatabaseError::Corrupt(format!("unserializable metadata: {}", e)))?;

    conn.execute(
        "INSERT INTO experts (id, display_name, profile_text, metadata_json, embedding, dimension, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
         ON CONFLICT(id) DO UPDATE SET
             display_name = excluded.display_name,
             profile_text = excluded.profile_text,
             metadata_json = excluded.metadata_json,
             embedding = excluded.embedding,
             dimension = excluded.dimension,
             updated_at = excluded.updated_at",
        params![
            expert.profile.id.as_str(),
            expert.profile.display_name,
            expert.profile.profile_text,
            metadata_json,
            encode_vector(&expert.embedding),
            expert.embedding.len() as i64,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Gets all experts ordered by id.
pub fn get_all(conn: &Connection) -> Result<Vec<StoredExpert>> {
    let mut stmt = conn.prepare(&format!("{} ORDER BY id", SELECT_COLUMNS))?;
    let rows = stmt.query_map([], read_row)?;

    let mut experts = Vec::new();
    for raw in rows {
        experts.push(decode_row(raw?)?);
    }
    Ok(experts)
}

/// Deletes an expert. Returns whether a row was removed.
pub fn delete(conn: &Connection, id: &str) -> Result<bool> {
    let removed = conn.execute("DELETE FROM experts WHERE id = ?1", params![id])?;
    Ok(removed > 0)
}

/// Deletes every expert. Returns the number of rows removed.
pub fn delete_all(conn: &Connection) -> Result<usize> {
    Ok(conn.execute("DELETE FROM experts", [])?)
}

/// Reads an index metadata value.
pub fn get_meta(conn: &Connection, key: &str) -> Result<Option<String>> {
    Ok(conn
        .query_row(
            "SELECT value FROM index_meta WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?)
}

/// Writes an index metadata value.
pub fn set_meta(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO index_meta (key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, value, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}
