//! SQL schema definitions as const strings.
//!
//! Contains the SQLite schema backing the expert index.

/// SQL to create the experts table.
///
/// `embedding` holds little-endian `f32` values; `dimension` is stored
/// alongside so a truncated blob is detectable on load.
pub const CREATE_EXPERTS: &str = r#"
CREATE TABLE IF NOT EXISTS experts (
    id TEXT PRIMARY KEY,
    display_name TEXT NOT NULL,
    profile_text TEXT NOT NULL,
    metadata_json TEXT NOT NULL DEFAULT '{}',
    embedding BLOB NOT NULL,
    dimension INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
"#;

/// SQL to create expert indexes.
pub const CREATE_EXPERT_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_experts_name ON experts(display_name)
"#;

/// SQL to create the index metadata table (key/value).
pub const CREATE_INDEX_META: &str = r#"
CREATE TABLE IF NOT EXISTS index_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
"#;

/// Returns all schema creation statements in order.
pub fn all_migrations() -> Vec<&'static str> {
    vec![CREATE_EXPERTS, CREATE_EXPERT_INDEXES, CREATE_INDEX_META]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_migrations_returns_statements() {
        assert_eq!(all_migrations().len(), 3);
    }

    #[test]
    fn create_experts_is_valid_sql() {
        assert!(CREATE_EXPERTS.contains("CREATE TABLE"));
        assert!(CREATE_EXPERTS.contains("id TEXT PRIMARY KEY"));
        assert!(CREATE_EXPERTS.contains("embedding BLOB NOT NULL"));
    }

    #[test]
    fn statements_use_if_not_exists() {
        for migration in all_migrations() {
            assert!(migration.contains("IF NOT EXISTS"));
        }
    }
}
