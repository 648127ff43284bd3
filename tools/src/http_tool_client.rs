//! HTTP-backed `ToolClient` calling the document store's `search_docs`
//! and `open_citation` endpoints. Grounded in the teacher's HTTP-adapter
//! shape (`src/llm/adapters/openai.rs`) for the request/response
//! plumbing, and in spec §4.4's three-way error classification, which
//! this client derives from HTTP status code the same way
//! `execution_engine/preconditions.rs` turns a failed precondition into
//! one of a small, closed set of typed errors rather than a bare string.

use agent_core::ports::{OpenedChunkText, ToolClient, ToolError};
use agent_core::state::SearchHit;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub struct HttpToolClient {
    base_url: String,
    http: reqwest::Client,
    max_results: usize,
}

impl HttpToolClient {
    pub fn new(base_url: impl Into<String>, max_results: usize) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
            max_results,
        }
    }
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    user_id: &'a str,
    limit: usize,
}

#[derive(Deserialize)]
struct SearchResponseHit {
    doc_id: String,
    chunk_id: String,
    chunk_index: u32,
    snippet: String,
    score: f32,
    filename: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: Vec<SearchResponseHit>,
}

#[derive(Serialize)]
struct OpenRequest<'a> {
    doc_id: &'a str,
    chunk_id: &'a str,
    user_id: &'a str,
}

#[derive(Deserialize)]
struct OpenResponse {
    doc_id: String,
    chunk_id: String,
    chunk_index: u32,
    text: String,
    filename: String,
}

fn classify_status(status: reqwest::StatusCode, body: String) -> ToolError {
    if status == reqwest::StatusCode::BAD_REQUEST || status == reqwest::StatusCode::NOT_FOUND {
        ToolError::Validation(body)
    } else if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        ToolError::Access(body)
    } else {
        ToolError::Other(format!("HTTP {status}: {body}"))
    }
}

#[async_trait]
impl ToolClient for HttpToolClient {
    async fn search_docs(&self, query: &str, user_id: &str) -> Result<Vec<SearchHit>, ToolError> {
        let url = format!("{}/search_docs", self.base_url.trim_end_matches('/'));
        let body = SearchRequest {
            query,
            user_id,
            limit: self.max_results,
        };

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ToolError::Other(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, text));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| ToolError::Other(format!("invalid search_docs response: {e}")))?;

        debug!(query, hit_count = parsed.hits.len(), "search_docs returned");

        let hits = parsed
            .hits
            .into_iter()
            .take(self.max_results)
            .map(|h| SearchHit {
                doc_id: h.doc_id,
                chunk_id: h.chunk_id,
                chunk_index: h.chunk_index,
                snippet: clip(&h.snippet, 250),
                score: h.score,
                filename: h.filename,
                query: query.to_string(),
            })
            .collect();

        Ok(hits)
    }

    async fn open_citation(
        &self,
        doc_id: &str,
        chunk_id: &str,
        user_id: &str,
    ) -> Result<OpenedChunkText, ToolError> {
        let url = format!("{}/open_citation", self.base_url.trim_end_matches('/'));
        let body = OpenRequest {
            doc_id,
            chunk_id,
            user_id,
        };

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ToolError::Other(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, text));
        }

        let parsed: OpenResponse = response
            .json()
            .await
            .map_err(|e| ToolError::Other(format!("invalid open_citation response: {e}")))?;

        debug!(doc_id, chunk_id, text_len = parsed.text.len(), "open_citation returned");

        Ok(OpenedChunkText {
            doc_id: parsed.doc_id,
            chunk_id: parsed.chunk_id,
            chunk_index: parsed.chunk_index,
            text: parsed.text,
            filename: parsed.filename,
        })
    }
}

fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(max).collect::<String>())
    }
}
