//! Expert profile domain types.
//!
//! An [`ExpertProfile`] is the unit stored in the expert index. Its
//! `profile_text` is what gets embedded; metadata rides along for filtering
//! and for rendering answers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::ExpertId;

/// Metadata key holding the free-text area of expertise.
pub const EXPERTISE_KEY: &str = "expertise";
/// Metadata key holding the longer biography/description.
pub const DESCRIPTION_KEY: &str = "description";
/// Metadata key holding the expert's organization.
pub const ORGANIZATION_KEY: &str = "organization";
/// Metadata key holding comma-separated tags.
pub const TAGS_KEY: &str = "tags";

/// A scalar metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl MetadataValue {
    /// Returns the value as a string slice if it is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Parses a command-line style value: booleans and numbers are recognized,
    /// everything else is text.
    pub fn parse(raw: &str) -> Self {
        if let Ok(b) = raw.parse::<bool>() {
            return Self::Bool(b);
        }
        if let Ok(i) = raw.parse::<i64>() {
            return Self::Integer(i);
        }
        if let Ok(f) = raw.parse::<f64>() {
            if f.is_finite() {
                return Self::Float(f);
            }
        }
        Self::Text(raw.to_string())
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for MetadataValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<bool> for MetadataValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Metadata attached to an expert profile, ordered by key.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// A subject-matter expert as stored in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpertProfile {
    /// Unique, stable identifier.
    pub id: ExpertId,
    /// Human-readable name.
    pub display_name: String,
    /// Free text describing the expert's knowledge. This is what is embedded.
    pub profile_text: String,
    /// Scalar attributes such as organization or tags.
    #[serde(default)]
    pub metadata: Metadata,
}

impl ExpertProfile {
    /// Creates a profile with no metadata.
    pub fn new(
        id: impl Into<ExpertId>,
        display_name: impl Into<String>,
        profile_text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            profile_text: profile_text.into(),
            metadata: Metadata::new(),
        }
    }

    /// Adds a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns a text metadata value by key.
    pub fn metadata_text(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(MetadataValue::as_text)
    }

    /// Returns the tags listed under the `tags` metadata key.
    pub fn tags(&self) -> Vec<&str> {
        self.metadata_text(TAGS_KEY)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Short one-line label used in fallback answers: the name plus
    /// organization or expertise when known.
    pub fn label(&self) -> String {
        match self
            .metadata_text(ORGANIZATION_KEY)
            .or_else(|| self.metadata_text(EXPERTISE_KEY))
        {
            Some(detail) if !detail.trim().is_empty() => {
                format!("{} ({})", self.display_name, detail.trim())
            }
            _ => self.display_name.clone(),
        }
    }
}

/// Input for registering a new expert.
///
/// Mirrors the intake form: a name, an area of expertise, and a description.
/// The embedded profile text is the expertise followed by the description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewExpert {
    pub name: String,
    pub expertise: String,
    pub description: String,
    /// Optional stable id; a UUID is minted when absent.
    #[serde(default)]
    pub id: Option<ExpertId>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl NewExpert {
    pub fn new(
        name: impl Into<String>,
        expertise: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            expertise: expertise.into(),
            description: description.into(),
            id: None,
            metadata: Metadata::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<ExpertId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Text that represents this expert in embedding space.
    pub fn profile_text(&self) -> String {
        format!("{} {}", self.expertise.trim(), self.description.trim())
            .trim()
            .to_string()
    }

    /// Converts the intake form into a storable profile.
    pub fn into_profile(self) -> ExpertProfile {
        let profile_text = self.profile_text();
        let mut metadata = self.metadata;
        metadata.insert(EXPERTISE_KEY.to_string(), self.expertise.into());
        metadata.insert(DESCRIPTION_KEY.to_string(), self.description.into());

        ExpertProfile {
            id: self.id.unwrap_or_else(ExpertId::generate),
            display_name: self.name,
            profile_text,
            metadata,
        }
    }
}
