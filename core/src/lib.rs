//! Agent Core
//!
//! Pure data model for the bounded agent runtime: constraints derived from
//! the user question, the mutable state a run accumulates, the tagged-union
//! action protocol spoken with the oracle, the append-only trace, and
//! grounded citations. No I/O lives here — this crate only defines shapes
//! and the small amount of pure logic that operates purely on those shapes
//! (budget bookkeeping, citation identity).

pub mod action;
pub mod citation;
pub mod config;
pub mod constraints;
pub mod error;
pub mod ports;
pub mod state;
pub mod trace;

pub use action::{Action, FinalAction, InsufficiencyRef, ToolCallAction, UsedCitationRef};
pub use citation::GroundedCitation;
pub use config::RunConfig;
pub use constraints::{ConflictRule, Constraints};
pub use error::CoreError;
pub use ports::{
    OpenedChunkText, OracleClient, OracleError, OracleMessage, OracleRole, ToolClient, ToolError,
};
pub use state::{AgentState, Insufficiency, OpenedChunk, SearchHit};
pub use trace::TraceEntry;
