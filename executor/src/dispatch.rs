//! Tool dispatch (spec §4.4): `search_docs` and `open_citation`,
//! pre-incrementing the tool-call budget, resolving truncated
//! identifiers, and classifying every failure into one of three error
//! classes without ever aborting the loop. Grounded in
//! `src/execution_engine/execution_budget.rs`'s "check, then record"
//! shape for budget bookkeeping.

use agent_core::ports::{ToolClient, ToolError};
use agent_core::AgentState;
use agent_tools::resolve_id;
use tracing::warn;

/// What happened when a tool call was dispatched. The Executor turns
/// this into the appropriate trace entries and notes; dispatch itself
/// never touches the trace.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Searched {
        query: String,
        hit_count: usize,
    },
    Opened {
        citation_num: u32,
        doc_id: String,
        chunk_id: String,
    },
    Error {
        message: String,
    },
}

fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(max).collect::<String>())
    }
}

/// Dispatches a `search_docs` tool call. Pre-increments the tool budget
/// regardless of outcome (spec §4.4: "each user invocation pre-increments
/// toolCallsUsed").
pub async fn dispatch_search(
    tool: &dyn ToolClient,
    state: &mut AgentState,
    user_id: &str,
    query: &str,
    max_results: usize,
) -> DispatchOutcome {
    state.tool_calls_used += 1;

    if query.trim().is_empty() {
        return DispatchOutcome::Error {
            message: "search_docs: query must not be empty".to_string(),
        };
    }

    match tool.search_docs(query, user_id).await {
        Ok(hits) => {
            let clipped: Vec<_> = hits
                .into_iter()
                .take(max_results)
                .map(|mut h| {
                    h.snippet = clip(&h.snippet, 250);
                    h
                })
                .collect();
            let hit_count = clipped.len();
            state.record_search(query.to_string(), clipped);
            DispatchOutcome::Searched {
                query: query.to_string(),
                hit_count,
            }
        }
        Err(e) => DispatchOutcome::Error {
            message: classify_tool_error("search_docs", &e),
        },
    }
}

/// Dispatches an `open_citation` tool call, applying the UUID resolution
/// policy (spec §4.4) before calling the tool: exact (case-insensitive)
/// match, then unique prefix match, then unique substring match for
/// candidates of length >= 12; if `docId` resolves but `chunkId` doesn't,
/// fall back to the first chunk search returned for that doc.
pub async fn dispatch_open(
    tool: &dyn ToolClient,
    state: &mut AgentState,
    user_id: &str,
    doc_id_candidate: &str,
    chunk_id_candidate: &str,
    max_citation_text: usize,
    max_window: usize,
) -> DispatchOutcome {
    state.tool_calls_used += 1;

    if doc_id_candidate.trim().is_empty() || chunk_id_candidate.trim().is_empty() {
        return DispatchOutcome::Error {
            message: "open_citation: docId and chunkId are both required".to_string(),
        };
    }

    let known_docs = state.known_doc_ids();
    let doc_id = resolve_id(doc_id_candidate, &known_docs)
        .map(|s| s.to_string())
        .unwrap_or_else(|| doc_id_candidate.to_string());

    let known_chunks_for_doc: Vec<&str> = state
        .search_results
        .iter()
        .filter(|h| h.doc_id == doc_id)
        .map(|h| h.chunk_id.as_str())
        .collect();

    let chunk_id = resolve_id(chunk_id_candidate, &known_chunks_for_doc)
        .map(|s| s.to_string())
        .or_else(|| {
            state
                .search_results
                .iter()
                .find(|h| h.doc_id == doc_id)
                .map(|h| h.chunk_id.clone())
        })
        .unwrap_or_else(|| chunk_id_candidate.to_string());

    match tool.open_citation(&doc_id, &chunk_id, user_id).await {
        Ok(chunk) => {
            let text = clip(&chunk.text, max_citation_text);
            let citation_num = state.record_opened_chunk(
                chunk.doc_id.clone(),
                chunk.chunk_id.clone(),
                chunk.chunk_index,
                text,
                chunk.filename,
                max_window,
            );
            DispatchOutcome::Opened {
                citation_num,
                doc_id: chunk.doc_id,
                chunk_id: chunk.chunk_id,
            }
        }
        Err(e) => {
            warn!(doc_id, chunk_id, error = %e, "open_citation failed");
            let hint = validation_hint(state);
            let message = classify_tool_error("open_citation", &e);
            DispatchOutcome::Error {
                message: if hint.is_empty() {
                    message
                } else {
                    format!("{message}. Known identifiers: {hint}")
                },
            }
        }
    }
}

fn classify_tool_error(tool: &str, err: &ToolError) -> String {
    match err {
        ToolError::Validation(msg) => format!("{tool} validation error: {msg}"),
        ToolError::Access(msg) => format!("{tool} access denied: {msg}"),
        ToolError::Other(msg) => format!("{tool} transport error: {msg}"),
    }
}

/// Up to 5 complete `(docId, chunkId, filename)` triples, as a hint for
/// the model after a failed `open_citation` (spec §4.4).
fn validation_hint(state: &AgentState) -> String {
    state
        .search_results
        .iter()
        .take(5)
        .map(|h| format!("({}, {}, {})", h.doc_id, h.chunk_id, h.filename))
        .collect::<Vec<_>>()
        .join(", ")
}
