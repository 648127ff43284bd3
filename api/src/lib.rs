//! Agent API
//!
//! The HTTP boundary of the bounded agent runtime (spec §6): a thin
//! axum server exposing `POST /agent/run`, `POST /agent/stream`, and
//! `GET /health`, delegating all reasoning to `agent-executor`. Mirrors
//! the teacher's `api` crate shape — `handlers`, `models`, `server` —
//! plus an `error` module for the typed HTTP error mapping spec §6
//! requires.

pub mod error;
pub mod handlers;
pub mod models;
pub mod server;

pub use error::ApiError;
pub use handlers::{health_check, run_agent, stream_agent};
pub use models::{
    AgentRunRequest, AgentRunResponse, ApiCitation, ApiConfig, ApiErrorBody, ApiErrorCode,
    ApiInsufficiency,
};
pub use server::{AppState, ApiServer};
