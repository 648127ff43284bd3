//! Fake `OracleClient`/`ToolClient` for tests, fixture-driven instead of
//! performing real I/O. Grounded directly in
//! `src/llm/adapters/transport_fake.rs`'s `FakeTransport`: canned
//! responses or a canned error, no network.

use std::sync::Mutex;

use agent_core::ports::{OpenedChunkText, OracleClient, OracleError, OracleMessage, ToolClient, ToolError};
use agent_core::state::SearchHit;
use async_trait::async_trait;

/// Replays a fixed sequence of oracle replies, one per call. Panics if
/// called more times than it has fixtures queued — tests should supply
/// exactly as many replies as the scenario needs.
pub struct FakeOracleClient {
    replies: Mutex<Vec<Result<String, OracleError>>>,
    calls: Mutex<Vec<Vec<OracleMessage>>>,
}

impl FakeOracleClient {
    /// Fixtures are consumed in order; the last one given is returned for
    /// every call past the end of the queue instead of panicking, so a
    /// test doesn't need to over-provision exact-looking fixtures for
    /// error-path final retries.
    pub fn new(replies: Vec<&str>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.to_string())).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_error(msg: &str) -> Self {
        Self {
            replies: Mutex::new(vec![Err(OracleError::Transport(msg.to_string()))]),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl OracleClient for FakeOracleClient {
    async fn chat(
        &self,
        messages: &[OracleMessage],
        _temperature: f32,
        _max_tokens: u32,
    ) -> Result<String, OracleError> {
        self.calls.lock().unwrap().push(messages.to_vec());
        let mut replies = self.replies.lock().unwrap();
        if replies.len() > 1 {
            replies.remove(0)
        } else {
            replies
                .last()
                .cloned()
                .unwrap_or_else(|| Err(OracleError::Transport("no fixtures queued".to_string())))
        }
    }
}

/// Fixed corpus: every `search_docs` call returns the same hits
/// regardless of query (filtered to docs whose snippet contains the
/// query, case-insensitively, to keep fixture-building simple); every
/// `open_citation` call looks the requested `(doc_id, chunk_id)` up in a
/// fixed table.
pub struct FakeToolClient {
    hits: Vec<SearchHit>,
    chunks: Vec<OpenedChunkText>,
    deny_access_to: Vec<String>,
}

impl FakeToolClient {
    pub fn new(hits: Vec<SearchHit>, chunks: Vec<OpenedChunkText>) -> Self {
        Self {
            hits,
            chunks,
            deny_access_to: Vec::new(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    /// Subsequent `open_citation` calls for this doc_id return
    /// `ToolError::Access` instead of looking the chunk up.
    pub fn deny_access(mut self, doc_id: impl Into<String>) -> Self {
        self.deny_access_to.push(doc_id.into());
        self
    }
}

#[async_trait]
impl ToolClient for FakeToolClient {
    async fn search_docs(&self, query: &str, _user_id: &str) -> Result<Vec<SearchHit>, ToolError> {
        let lower = query.to_lowercase();
        let matching: Vec<SearchHit> = self
            .hits
            .iter()
            .filter(|h| h.snippet.to_lowercase().contains(&lower) || h.query.to_lowercase() == lower)
            .cloned()
            .map(|mut h| {
                h.query = query.to_string();
                h
            })
            .collect();
        Ok(if matching.is_empty() {
            self.hits.clone()
        } else {
            matching
        })
    }

    async fn open_citation(
        &self,
        doc_id: &str,
        chunk_id: &str,
        _user_id: &str,
    ) -> Result<OpenedChunkText, ToolError> {
        if self.deny_access_to.iter().any(|d| d == doc_id) {
            return Err(ToolError::Access(format!("access denied to {doc_id}")));
        }
        self.chunks
            .iter()
            .find(|c| c.doc_id == doc_id && c.chunk_id == chunk_id)
            .cloned()
            .ok_or_else(|| ToolError::Validation(format!("no such chunk: {doc_id}/{chunk_id}")))
    }
}
