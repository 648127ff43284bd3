//! Agent Tools
//!
//! Concrete, I/O-performing implementations of the `OracleClient` and
//! `ToolClient` interfaces defined in `agent-core::ports`, plus the
//! opaque-identifier resolution logic `open_citation` needs when a model
//! echoes back a truncated or slightly mangled id. Fakes for testing
//! live alongside the real implementations, grounded in the teacher's
//! `transport_fake.rs` fixture-based approach.

pub mod fake;
pub mod http_oracle;
pub mod http_tool_client;
pub mod id_resolution;

pub use fake::{FakeOracleClient, FakeToolClient};
pub use http_oracle::HttpOracleClient;
pub use http_tool_client::HttpToolClient;
pub use id_resolution::resolve_id;
