//! Shared error type for the parts of the model that are pure data
//! manipulation. Grounded in `execution_engine/errors.rs`'s `thiserror`
//! enum style.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("question is empty")]
    EmptyQuestion,
}
