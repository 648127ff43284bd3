//! Citation Grounder (spec §4.10)
//!
//! `(answer, claimed_used_citations, state) -> GroundingResult`. Resolves
//! every citation the model claims it used, and every `[n]` marker
//! scanned from the answer text, against what was actually opened this
//! run; strips markers nothing backs; falls back to the best search hits
//! when nothing was ever opened. Grounded in the "assign IDs once,
//! resolve many times" shape of the teacher's chat-loop citation
//! bookkeeping, generalized to a full-lifetime lookup so a grounded
//! citation survives eviction from the rolling prompt window.

use std::collections::HashMap;

use agent_core::{AgentState, GroundedCitation, OpenedChunk, SearchHit, UsedCitationRef};

use crate::validator::extract_bracket_markers;

/// Per-chunk snippet length exposed in a `GroundedCitation` (spec §4.10
/// step 2: `snippet = text[0..200]`).
const GROUNDED_SNIPPET_LEN: usize = 200;

/// The cleaned answer (hallucinated `[n]` markers stripped, whitespace
/// collapsed) plus the citations that back it.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundingResult {
    pub cleaned_answer: String,
    pub citations: Vec<GroundedCitation>,
}

fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        text.chars().take(max).collect()
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn citation_from_chunk(chunk: &OpenedChunk) -> GroundedCitation {
    GroundedCitation {
        doc_id: chunk.doc_id.clone(),
        chunk_id: chunk.chunk_id.clone(),
        chunk_index: chunk.chunk_index,
        snippet: clip(&chunk.text, GROUNDED_SNIPPET_LEN),
        filename: chunk.filename.clone(),
        score: 1.0,
    }
}

/// Grounds a proposed final answer against what this run actually
/// opened. `claimed` is the model's own `used_citations` array.
pub fn ground_citations(
    answer: &str,
    claimed: &[UsedCitationRef],
    state: &AgentState,
) -> GroundingResult {
    if state.citation_history.is_empty() {
        return GroundingResult {
            cleaned_answer: answer.to_string(),
            citations: fallback_from_search_hits(&state.search_results),
        };
    }

    let by_num: HashMap<u32, &OpenedChunk> = state
        .citation_history
        .iter()
        .map(|c| (c.citation_num, c))
        .collect();
    let by_id: HashMap<(&str, &str), &OpenedChunk> = state
        .citation_history
        .iter()
        .map(|c| ((c.doc_id.as_str(), c.chunk_id.as_str()), c))
        .collect();

    let mut citations: Vec<GroundedCitation> = Vec::new();
    let mut used_keys: Vec<(String, String)> = Vec::new();

    for claim in claimed {
        let key = (claim.doc_id.as_str(), claim.chunk_id.as_str());
        if let Some(chunk) = by_id.get(&key) {
            let owned_key = (chunk.doc_id.clone(), chunk.chunk_id.clone());
            if !used_keys.contains(&owned_key) {
                used_keys.push(owned_key);
                citations.push(citation_from_chunk(chunk));
            }
        }
    }

    let markers = extract_bracket_markers(answer);
    let mut cleaned_answer = answer.to_string();

    for marker in &markers {
        match by_num.get(marker) {
            Some(chunk) => {
                let owned_key = (chunk.doc_id.clone(), chunk.chunk_id.clone());
                if !used_keys.contains(&owned_key) {
                    used_keys.push(owned_key);
                    citations.push(citation_from_chunk(chunk));
                }
            }
            None => {
                // Strip the hallucinated marker from the answer.
                let pattern = format!("[{marker}]");
                cleaned_answer = cleaned_answer.replace(&pattern, "");
            }
        }
    }
    cleaned_answer = collapse_whitespace(&cleaned_answer);

    // Fallback to search hits only applies when nothing was ever opened
    // this run (handled above); once a chunk has been opened, an empty
    // grounded list here means the model's claims just didn't match
    // anything real, not that evidence is missing.

    GroundingResult {
        cleaned_answer,
        citations,
    }
}

/// When nothing was ever opened this run (e.g. `search_docs` ran but the
/// model finalized before calling `open_citation`), fall back to up to 3
/// top-scoring search hits so the answer still carries some grounded
/// evidence rather than none at all (spec §4.10 step 5).
fn fallback_from_search_hits(search_results: &[SearchHit]) -> Vec<GroundedCitation> {
    let mut hits: Vec<&SearchHit> = search_results.iter().collect();
    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    let mut citations = Vec::new();
    let mut seen: Vec<(String, String)> = Vec::new();
    for hit in hits {
        let key = (hit.doc_id.clone(), hit.chunk_id.clone());
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        citations.push(GroundedCitation {
            doc_id: hit.doc_id.clone(),
            chunk_id: hit.chunk_id.clone(),
            chunk_index: hit.chunk_index,
            snippet: clip(&hit.snippet, GROUNDED_SNIPPET_LEN),
            filename: hit.filename.clone(),
            score: hit.score,
        });
        if citations.len() >= 3 {
            break;
        }
    }
    citations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(doc: &str, chunk: &str, score: f32) -> SearchHit {
        SearchHit {
            doc_id: doc.to_string(),
            chunk_id: chunk.to_string(),
            chunk_index: 0,
            snippet: format!("snippet for {doc}/{chunk}"),
            score,
            filename: "f.txt".to_string(),
            query: "q".to_string(),
        }
    }

    #[test]
    fn resolves_claimed_citation_by_doc_and_chunk_id() {
        let mut state = AgentState::new();
        state.record_opened_chunk(
            "doc-1".into(),
            "chunk-1".into(),
            0,
            "the actual text".into(),
            "f.txt".into(),
            5,
        );
        let claimed = vec![UsedCitationRef {
            doc_id: "doc-1".into(),
            chunk_id: "chunk-1".into(),
            chunk_index: 0,
        }];
        let result = ground_citations("See [1].", &claimed, &state);
        assert_eq!(result.citations.len(), 1);
        assert_eq!(result.citations[0].doc_id, "doc-1");
        assert_eq!(result.cleaned_answer, "See [1].");
    }

    #[test]
    fn resolves_bracket_marker_without_claimed_citation() {
        let mut state = AgentState::new();
        state.record_opened_chunk("doc-1".into(), "chunk-1".into(), 0, "text".into(), "f.txt".into(), 5);
        let result = ground_citations("See [1].", &[], &state);
        assert_eq!(result.citations.len(), 1);
    }

    #[test]
    fn strips_hallucinated_marker_from_answer() {
        let mut state = AgentState::new();
        state.record_opened_chunk("doc-1".into(), "chunk-1".into(), 0, "text".into(), "f.txt".into(), 5);
        let result = ground_citations("See [1] and [9].", &[], &state);
        assert_eq!(result.citations.len(), 1);
        assert!(!result.cleaned_answer.contains("[9]"));
        assert!(result.cleaned_answer.contains("[1]"));
    }

    #[test]
    fn collapses_whitespace_left_by_stripped_marker() {
        let mut state = AgentState::new();
        state.record_opened_chunk("doc-1".into(), "chunk-1".into(), 0, "text".into(), "f.txt".into(), 5);
        let result = ground_citations("See [9]  right here.", &[], &state);
        assert!(!result.cleaned_answer.contains("  "));
    }

    #[test]
    fn grounding_survives_rolling_window_eviction() {
        let mut state = AgentState::new();
        for i in 0..7 {
            state.record_opened_chunk("doc".into(), format!("chunk-{i}"), i, format!("text {i}"), "f.txt".into(), 5);
        }
        assert!(state.opened_citations.iter().all(|c| c.citation_num != 1));
        let result = ground_citations("Per [1].", &[], &state);
        assert_eq!(result.citations.len(), 1);
        assert_eq!(result.citations[0].chunk_id, "chunk-0");
    }

    #[test]
    fn unresolvable_claims_and_markers_ground_nothing_once_something_was_opened() {
        let mut state = AgentState::new();
        state.record_opened_chunk("doc-1".into(), "chunk-1".into(), 0, "text".into(), "f.txt".into(), 5);
        state.record_search("q".into(), vec![hit("doc-a", "c1", 0.9)]);
        let result = ground_citations("No markers here at all.", &[], &state);
        // A chunk was opened this run, so the search-hit fallback does not
        // apply even though nothing ended up grounded.
        assert!(result.citations.is_empty());
    }

    #[test]
    fn no_opened_chunks_falls_back_to_top_search_hits() {
        let mut state = AgentState::new();
        state.record_search("q".into(), vec![hit("doc-a", "c1", 0.9), hit("doc-b", "c2", 0.5)]);
        let result = ground_citations("Based on the search results.", &[], &state);
        assert_eq!(result.citations.len(), 2);
        assert_eq!(result.citations[0].doc_id, "doc-a");
    }

    #[test]
    fn fallback_caps_at_three() {
        let mut state = AgentState::new();
        state.record_search(
            "q".into(),
            vec![hit("a", "1", 0.9), hit("b", "2", 0.8), hit("c", "3", 0.7), hit("d", "4", 0.6)],
        );
        let result = ground_citations("answer", &[], &state);
        assert_eq!(result.citations.len(), 3);
    }

    #[test]
    fn no_context_at_all_returns_empty() {
        let state = AgentState::new();
        let result = ground_citations("No sources at all.", &[], &state);
        assert!(result.citations.is_empty());
    }

    #[test]
    fn snippet_is_clipped_to_200_chars() {
        let mut state = AgentState::new();
        let long_text = "x".repeat(500);
        state.record_opened_chunk("doc-1".into(), "chunk-1".into(), 0, long_text, "f.txt".into(), 5);
        let result = ground_citations("See [1].", &[], &state);
        assert_eq!(result.citations[0].snippet.len(), 200);
    }
}
