//! HTTP error mapping (spec §6, §7 item 9): every error surfaced to a
//! caller is one of `VALIDATION_ERROR` (400) / `AGENT_ERROR` (500) /
//! `INTERNAL_ERROR` (500), never a leaked internal exception. Grounded
//! in the teacher handlers' `Result<Json<T>, StatusCode>` pattern
//! (`api/src/handlers/mod.rs`), generalized to a typed enum carrying
//! the discriminant spec §6 requires instead of a bare `StatusCode`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::models::{ApiErrorBody, ApiErrorCode};

#[derive(Debug, Error)]
pub enum ApiError {
    /// Spec §7 item 1: empty/oversize question, unsupported `mode`.
    #[error("{0}")]
    Validation(String),
    /// Spec §7 item 9: the executor itself failed unexpectedly for a
    /// reason other than the resource-exhaustion paths it already
    /// handles internally (those resolve to a synthesized answer, not
    /// an error).
    #[error("{0}")]
    Agent(String),
    /// Anything else: never expose the original cause to the caller.
    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

impl From<agent_core::CoreError> for ApiError {
    fn from(e: agent_core::CoreError) -> Self {
        ApiError::Validation(e.to_string())
    }
}

impl From<agent_executor::ExecutorError> for ApiError {
    fn from(e: agent_executor::ExecutorError) -> Self {
        match e {
            agent_executor::ExecutorError::Core(core_err) => core_err.into(),
            other => ApiError::Agent(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, ApiErrorCode::ValidationError, msg.clone())
            }
            ApiError::Agent(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, ApiErrorCode::AgentError, msg.clone())
            }
            ApiError::Internal(err) => {
                tracing::error!(error = %err, "internal agent-api error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorCode::InternalError,
                    "an internal error occurred".to_string(),
                )
            }
        };

        (status, Json(ApiErrorBody { error: message, code })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_empty_question_maps_to_validation() {
        let err: ApiError = agent_core::CoreError::EmptyQuestion.into();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
