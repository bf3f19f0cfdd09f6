//! Core identifier types for domain entities.
//!
//! Expert ids are opaque strings: ingestion mints UUIDs, but profiles imported
//! from elsewhere may carry their own stable keys.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique, stable identifier for an expert profile.
///
/// Ordering is lexical on the underlying string, which the index uses to
/// break score ties deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpertId(pub String);

impl ExpertId {
    /// Mints a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExpertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ExpertId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ExpertId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}
