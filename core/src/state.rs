//! `AgentState` — the only thing the Executor mutates while a run is in
//! flight. Strictly local to one run; never shared across tasks.

use serde::{Deserialize, Serialize};

/// A single hit returned by `search_docs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub doc_id: String,
    pub chunk_id: String,
    pub chunk_index: u32,
    /// Clipped to <= 250 chars by the tool dispatcher before storage.
    pub snippet: String,
    pub score: f32,
    pub filename: String,
    /// The query string that produced this hit.
    pub query: String,
}

/// A chunk that was opened via `open_citation` and is available for the
/// model to cite. `citation_num` is assigned once, at open time, and is
/// never reused even after the chunk falls out of the rolling window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenedChunk {
    pub doc_id: String,
    pub chunk_id: String,
    pub chunk_index: u32,
    /// Clipped to `MAX_CITATION_TEXT_FOR_LLM` chars for prompt display.
    /// The validator may be given the untruncated text separately.
    pub text: String,
    pub filename: String,
    pub citation_num: u32,
}

/// A reported gap: something a required section needed but could not be
/// found in the retrieved corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insufficiency {
    pub section: String,
    pub missing: String,
    pub queries_tried: Vec<String>,
}

/// Mutable, run-local agent state. Accumulates monotonically except for
/// the rolling `opened_citations` window, which evicts its oldest entry
/// once it exceeds `MAX_CONTEXT_CITATIONS` — the evicted entry's
/// `citation_num` remains valid and is tracked separately in
/// `all_citation_nums` so a marker referencing it is never treated as
/// hallucinated just because its text scrolled out of the prompt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentState {
    pub tool_calls_used: u32,
    pub search_queries: Vec<String>,
    pub search_results: Vec<SearchHit>,
    pub opened_citations: Vec<OpenedChunk>,
    pub notes: Vec<String>,
    pub insufficiencies: Vec<Insufficiency>,
    /// Full-lifetime map from citation number to its chunk, independent of
    /// the rolling `opened_citations` window. See `CitationGrounder`.
    pub citation_history: Vec<OpenedChunk>,
    next_citation_num: u32,
}

impl AgentState {
    pub fn new() -> Self {
        Self {
            next_citation_num: 1,
            ..Default::default()
        }
    }

    /// Distinct searches counted by distinct query string (spec invariant 5).
    pub fn distinct_search_count(&self) -> usize {
        self.search_queries.len()
    }

    pub fn open_citation_count(&self) -> usize {
        self.citation_history.len()
    }

    /// Record a new search query if it hasn't been seen before, and append
    /// its hits. Returns whether the query was novel.
    pub fn record_search(&mut self, query: String, hits: Vec<SearchHit>) -> bool {
        let is_new = !self.search_queries.contains(&query);
        if is_new {
            self.search_queries.push(query);
        }
        self.search_results.extend(hits);
        is_new
    }

    /// Allocate the next citation number and record the opened chunk in
    /// both the rolling window (`opened_citations`, capped at `max_window`)
    /// and the full-lifetime `citation_history`.
    pub fn record_opened_chunk(
        &mut self,
        doc_id: String,
        chunk_id: String,
        chunk_index: u32,
        text: String,
        filename: String,
        max_window: usize,
    ) -> u32 {
        let citation_num = self.next_citation_num;
        self.next_citation_num += 1;

        let chunk = OpenedChunk {
            doc_id,
            chunk_id,
            chunk_index,
            text,
            filename,
            citation_num,
        };

        self.citation_history.push(chunk.clone());
        self.opened_citations.push(chunk);
        if self.opened_citations.len() > max_window {
            self.opened_citations.remove(0);
        }

        citation_num
    }

    pub fn push_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    /// Last 3 notes, for prompt display (spec §4.6 step 6).
    pub fn recent_notes(&self) -> &[String] {
        let len = self.notes.len();
        let start = len.saturating_sub(3);
        &self.notes[start..]
    }

    pub fn find_opened_by_id(&self, doc_id: &str, chunk_id: &str) -> Option<&OpenedChunk> {
        self.citation_history
            .iter()
            .find(|c| c.doc_id == doc_id && c.chunk_id == chunk_id)
    }

    pub fn find_opened_by_num(&self, citation_num: u32) -> Option<&OpenedChunk> {
        self.citation_history
            .iter()
            .find(|c| c.citation_num == citation_num)
    }

    /// All identifiers seen in search results so far, for UUID prefix
    /// resolution (spec §4.4).
    pub fn known_doc_ids(&self) -> Vec<&str> {
        self.search_results.iter().map(|h| h.doc_id.as_str()).collect()
    }

    pub fn known_chunk_ids(&self) -> Vec<&str> {
        self.search_results.iter().map(|h| h.chunk_id.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn citation_num_monotonic_and_unique() {
        let mut state = AgentState::new();
        let a = state.record_opened_chunk(
            "d1".into(),
            "c1".into(),
            0,
            "text".into(),
            "f.txt".into(),
            5,
        );
        let b = state.record_opened_chunk(
            "d1".into(),
            "c2".into(),
            1,
            "text2".into(),
            "f.txt".into(),
            5,
        );
        assert_eq!(a, 1);
        assert_eq!(b, 2);
        assert_ne!(a, b);
    }

    #[test]
    fn rolling_window_evicts_but_history_keeps_citation_num() {
        let mut state = AgentState::new();
        for i in 0..7 {
            state.record_opened_chunk(
                "d".into(),
                format!("c{i}"),
                i,
                "t".into(),
                "f".into(),
                5,
            );
        }
        assert_eq!(state.opened_citations.len(), 5);
        assert_eq!(state.citation_history.len(), 7);
        // citation_num 1 (first opened) was evicted from the window...
        assert!(state.opened_citations.iter().all(|c| c.citation_num != 1));
        // ...but is still resolvable via the full-lifetime history.
        assert!(state.find_opened_by_num(1).is_some());
    }

    #[test]
    fn distinct_search_counts_unique_queries_only() {
        let mut state = AgentState::new();
        state.record_search("reindex sql".into(), vec![]);
        state.record_search("reindex sql".into(), vec![]);
        state.record_search("delete verification".into(), vec![]);
        assert_eq!(state.distinct_search_count(), 2);
    }

    #[test]
    fn recent_notes_caps_at_three() {
        let mut state = AgentState::new();
        for i in 0..5 {
            state.push_note(format!("note {i}"));
        }
        let recent = state.recent_notes();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0], "note 2");
        assert_eq!(recent[2], "note 4");
    }
}
