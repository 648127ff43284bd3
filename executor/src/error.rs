//! Fatal, per-run executor errors. Everything else (tool failures,
//! oracle transport failures, validation rejections) is ordinary control
//! flow recorded in the trace — spec §7 error taxonomy items 3-8 never
//! reach this type. This only covers item 9: an unexpected internal
//! failure that must never leak past the run boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error(transparent)]
    Core(#[from] agent_core::CoreError),
    #[error("internal executor error: {0}")]
    Internal(String),
}
