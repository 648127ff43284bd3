//! Wire types for the agent HTTP API (spec §6). Grounded in the
//! teacher's `api/src/models.rs` request/response struct style —
//! plain `Serialize`/`Deserialize` structs with `#[serde(default)]`
//! on optional request fields, no hand-rolled parsing.

use serde::{Deserialize, Serialize};

use agent_core::{GroundedCitation, Insufficiency, TraceEntry};

/// `POST /agent/run` and `POST /agent/stream` share this request body
/// (spec §6).
#[derive(Debug, Clone, Deserialize)]
pub struct AgentRunRequest {
    pub question: String,
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default)]
    pub return_trace: bool,
    /// Accepted but not yet meaningfully distinguished by this core —
    /// the collaborator tier these flags would gate (a reranking /
    /// prompt-refinement pass ahead of `search_docs`) is out of scope
    /// per spec §1's external-collaborators boundary.
    #[serde(default)]
    pub refine_prompt: bool,
    #[serde(default)]
    pub rerank: bool,
}

fn default_mode() -> String {
    "agent".to_string()
}

/// One citation as returned to the HTTP caller. `document_title` is the
/// wire name for `GroundedCitation::filename` (spec §6 response shape
/// uses `documentTitle`, not `filename`).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCitation {
    pub doc_id: String,
    pub chunk_id: String,
    pub chunk_index: u32,
    pub snippet: String,
    pub document_title: String,
    pub score: f32,
}

impl From<GroundedCitation> for ApiCitation {
    fn from(c: GroundedCitation) -> Self {
        Self {
            doc_id: c.doc_id,
            chunk_id: c.chunk_id,
            chunk_index: c.chunk_index,
            snippet: c.snippet,
            document_title: c.filename,
            score: c.score,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiInsufficiency {
    pub section: String,
    pub missing: String,
    pub queries_tried: Vec<String>,
}

impl From<Insufficiency> for ApiInsufficiency {
    fn from(i: Insufficiency) -> Self {
        Self {
            section: i.section,
            missing: i.missing,
            queries_tried: i.queries_tried,
        }
    }
}

/// `POST /agent/run`'s response body (spec §6).
#[derive(Debug, Clone, Serialize)]
pub struct AgentRunResponse {
    pub answer: String,
    pub citations: Vec<ApiCitation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub insufficiencies: Vec<ApiInsufficiency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Vec<TraceEntry>>,
}

/// Error code discriminant spec §6 requires alongside the HTTP status.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiErrorCode {
    ValidationError,
    AgentError,
    InternalError,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
    pub code: ApiErrorCode,
}

/// Host/port/worker knobs for the HTTP server, mirroring the teacher's
/// `ApiConfig` in `api/src/models.rs`.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub version: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
