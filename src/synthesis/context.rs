//! Grounding context assembly.
//!
//! Renders ranked candidates into numbered text blocks under a character
//! budget. Blocks are taken in rank order and the first one that does not fit
//! ends the context, so lower-ranked experts are always the ones dropped.

use crate::domain::{ExpertId, ScoredCandidate};

/// Appended to the top-ranked block when it had to be cut to fit the budget.
pub const TRUNCATION_MARKER: &str = "[truncated]";

const BLOCK_SEPARATOR: &str = "\n\n";

/// The expert listing handed to the generative model.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundingContext {
    text: String,
    cited: Vec<ExpertId>,
    truncated: bool,
}

impl GroundingContext {
    /// Builds the context from `candidates`, which are ordered by rank before
    /// rendering.
    pub fn build(
        candidates: &[ScoredCandidate],
        max_chars: usize,
        metadata_keys: &[String],
    ) -> Self {
        let mut ordered: Vec<&ScoredCandidate> = candidates.iter().collect();
        ordered.sort_by_key(|c| c.rank);

        let mut text = String::new();
        let mut used = 0usize;
        let mut cited = Vec::new();
        let mut truncated = false;

        for (position, candidate) in ordered.into_iter().enumerate() {
            let block = render_block(position + 1, candidate, metadata_keys);
            let block_len = block.chars().count();
            let separator_len = if position == 0 {
                0
            } else {
                BLOCK_SEPARATOR.len()
            };

            if used + separator_len + block_len <= max_chars {
                if position > 0 {
                    text.push_str(BLOCK_SEPARATOR);
                }
                text.push_str(&block);
                used += separator_len + block_len;
                cited.push(candidate.id().clone());
                continue;
            }

            if position == 0 {
                let profile_len = candidate.expert.profile_text.trim().chars().count();
                if let Some(cut) = truncate_block(&block, block_len - profile_len, max_chars) {
                    text = cut;
                    cited.push(candidate.id().clone());
                    truncated = true;
                }
            }
            break;
        }

        Self {
            text,
            cited,
            truncated,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Ids of the experts included, in rank order.
    pub fn cited_experts(&self) -> &[ExpertId] {
        &self.cited
    }

    /// Whether the top-ranked block was cut.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn is_empty(&self) -> bool {
        self.cited.is_empty()
    }
}

fn render_block(number: usize, candidate: &ScoredCandidate, metadata_keys: &[String]) -> String {
    let expert = &candidate.expert;
    let mut block = format!("[{}] {}", number, expert.display_name);
    for key in metadata_keys {
        if let Some(value) = expert.metadata.get(key) {
            block.push_str(&format!("\n{}: {}", key, value));
        }
    }
    block.push('\n');
    block.push_str(expert.profile_text.trim());
    block
}

/// Cuts `block` on a char boundary so that it plus the marker fits `max_chars`.
///
/// Returns `None` when not even one character of profile text would survive
/// after the first `header_len` characters.
fn truncate_block(block: &str, header_len: usize, max_chars: usize) -> Option<String> {
    let reserved = TRUNCATION_MARKER.chars().count() + 1;
    let keep = max_chars.checked_sub(reserved)?;
    if keep <= header_len {
        return None;
    }
    let head: String = block.chars().take(keep).collect();
    Some(format!("{} {}", head.trim_end(), TRUNCATION_MARKER))
}
