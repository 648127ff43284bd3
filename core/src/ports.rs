//! Collaborator interfaces the core depends on but never looks up
//! globally (spec §9: "module-level singleton clients -> injected
//! interfaces"). Implementations live in `agent-tools`; `agent-executor`
//! wires concrete instances in.

use async_trait::async_trait;

use crate::state::SearchHit;

/// One chat-completion turn with a stateless LLM oracle.
///
/// Must be safe to call concurrently — the executor may run many agent
/// runs at once, each calling its own oracle instance (or a shared client)
/// from its own task.
#[async_trait]
pub trait OracleClient: Send + Sync {
    async fn chat(
        &self,
        messages: &[OracleMessage],
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, OracleError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleMessage {
    pub role: OracleRole,
    pub content: String,
}

impl OracleMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: OracleRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: OracleRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: OracleRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("oracle transport error: {0}")]
    Transport(String),
    #[error("oracle request timed out")]
    Timeout,
}

/// The two user-scoped document tools the agent may invoke.
#[async_trait]
pub trait ToolClient: Send + Sync {
    async fn search_docs(
        &self,
        query: &str,
        user_id: &str,
    ) -> Result<Vec<SearchHit>, ToolError>;

    async fn open_citation(
        &self,
        doc_id: &str,
        chunk_id: &str,
        user_id: &str,
    ) -> Result<OpenedChunkText, ToolError>;
}

/// Raw text returned by a successful `open_citation` call, pre-clipping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedChunkText {
    pub doc_id: String,
    pub chunk_id: String,
    pub chunk_index: u32,
    pub text: String,
    pub filename: String,
}

/// The three error classes spec §4.4 requires tool dispatch to
/// distinguish between.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("access denied: {0}")]
    Access(String),
    #[error("tool transport error: {0}")]
    Other(String),
}
