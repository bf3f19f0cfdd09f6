//! Metadata filters applied after vector search.

use serde::{Deserialize, Serialize};

use crate::domain::{ExpertProfile, MetadataValue};

/// Filter options for candidate experts.
///
/// All configured conditions must hold. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpertFilter {
    /// Metadata keys that must equal the given value.
    #[serde(default)]
    pub metadata: Vec<(String, MetadataValue)>,
    /// Tags that must all appear in the `tags` metadata (case-insensitive).
    #[serde(default)]
    pub tags: Vec<String>,
    /// Case-insensitive substring of the display name.
    #[serde(default)]
    pub name: Option<String>,
}

impl ExpertFilter {
    /// Creates an empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires a metadata key to have exactly this value.
    pub fn metadata_equals(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.push((key.into(), value.into()));
        self
    }

    /// Requires a tag.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Requires the display name to contain `query`.
    pub fn name_contains(mut self, query: impl Into<String>) -> Self {
        self.name = Some(query.into());
        self
    }

    /// Whether this filter has no conditions.
    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty() && self.tags.is_empty() && self.name.is_none()
    }

    /// Checks if a profile matches this filter.
    pub fn matches(&self, profile: &ExpertProfile) -> bool {
        for (key, expected) in &self.metadata {
            if profile.metadata.get(key) != Some(expected) {
                return false;
            }
        }

        if !self.tags.is_empty() {
            let tags: Vec<String> = profile.tags().into_iter().map(str::to_lowercase).collect();
            if !self
                .tags
                .iter()
                .all(|wanted| tags.contains(&wanted.to_lowercase()))
            {
                return false;
            }
        }

        if let Some(ref query) = self.name {
            if !profile
                .display_name
                .to_lowercase()
                .contains(&query.to_lowercase())
            {
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ORGANIZATION_KEY, TAGS_KEY};

    fn profile() -> ExpertProfile {
        ExpertProfile::new("1", "Dr. Layla Haddad", "Pediatric surgeon")
            .with_metadata(ORGANIZATION_KEY, "MSF")
            .with_metadata(TAGS_KEY, "Surgery, pediatrics")
            .with_metadata("years", 15i64)
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = ExpertFilter::new();
        assert!(filter.is_empty());
        assert!(filter.matches(&profile()));
    }

    #[test]
    fn metadata_equality() {
        assert!(ExpertFilter::new()
            .metadata_equals(ORGANIZATION_KEY, "MSF")
            .matches(&profile()));
        assert!(!ExpertFilter::new()
            .metadata_equals(ORGANIZATION_KEY, "WHO")
            .matches(&profile()));
        assert!(ExpertFilter::new()
            .metadata_equals("years", 15i64)
            .matches(&profile()));
        assert!(!ExpertFilter::new()
            .metadata_equals("missing", "x")
            .matches(&profile()));
    }

    #[test]
    fn tags_are_case_insensitive_and_all_required() {
        assert!(ExpertFilter::new().tag("surgery").matches(&profile()));
        assert!(ExpertFilter::new()
            .tag("SURGERY")
            .tag("Pediatrics")
            .matches(&profile()));
        assert!(!ExpertFilter::new()
            .tag("surgery")
            .tag("oncology")
            .matches(&profile()));
    }

    #[test]
    fn name_substring() {
        assert!(ExpertFilter::new().name_contains("layla").matches(&profile()));
        assert!(!ExpertFilter::new().name_contains("omar").matches(&profile()));
    }
}
