use serde::{Deserialize, Serialize};

use hybridrag_core::types::Meta;

/// Length of the content prefix that identifies a passage across both axes.
pub const DEDUP_KEY_CHARS: usize = 100;

/// First [`DEDUP_KEY_CHARS`] characters of `content`. Distinct passages
/// sharing that prefix are treated as the same passage.
pub fn dedup_key(content: &str) -> &str {
    content.char_indices().nth(DEDUP_KEY_CHARS).map_or(content, |(i, _)| &content[..i])
}

/// A passage seen by at least one axis. Missing scores are 0 and missing
/// ranks are `None` (ranked after everything).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    pub content: String,
    pub metadata: Meta,
    pub vector_score: f32,
    pub vector_rank: Option<usize>,
    pub keyword_score: f32,
    pub keyword_rank: Option<usize>,
}

impl CandidateResult {
    pub fn key(&self) -> &str {
        dedup_key(&self.content)
    }
}

/// One fused hit with the full breakdown behind its position. Scores are the
/// raw per-axis values; `combined_score` uses their normalized forms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedResult {
    pub content: String,
    pub metadata: Meta,
    pub combined_score: f32,
    pub vector_score: f32,
    pub keyword_score: f32,
    pub vector_rank: Option<usize>,
    pub keyword_rank: Option<usize>,
    pub alpha: f32,
    pub beta: f32,
}
