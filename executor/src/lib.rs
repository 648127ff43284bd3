//! Agent Executor
//!
//! The single stateful driver of the bounded agent runtime: owns the
//! main loop (spec §4.5), dispatches tool calls, and synthesizes a
//! fallback answer when the loop exits without an accepted final. A
//! pure function of `(question, userId, OracleClient, ToolClient,
//! RunConfig) -> RunOutcome` — everything else it calls into
//! (`agent-brain`) is itself a pure function of its inputs.

pub mod dispatch;
pub mod error;
pub mod run;
pub mod sink;

pub use dispatch::{dispatch_open, dispatch_search, DispatchOutcome};
pub use error::ExecutorError;
pub use run::{run, RunOutcome};
pub use sink::{ChannelSink, CollectSink, EventSink};
