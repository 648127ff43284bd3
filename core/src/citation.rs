//! Grounded citations — the only citation shape that ever leaves a run.

use serde::{Deserialize, Serialize};

/// A citation produced only from `openedCitations`, or from top search
/// hits in the specific fallback path where nothing was ever opened
/// (spec invariant 2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundedCitation {
    pub doc_id: String,
    pub chunk_id: String,
    pub chunk_index: u32,
    pub snippet: String,
    pub filename: String,
    pub score: f32,
}
