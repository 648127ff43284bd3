//! Append-only run trace. Stable schema (spec §6) — re-parsing emitted
//! trace JSON must reproduce the same entries.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraceEntry {
    Plan {
        steps: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        notes: Option<String>,
    },
    ToolCall {
        tool: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        input: Option<serde_json::Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        output_summary: Option<String>,
    },
    Validation {
        validation_errors: Vec<String>,
        notes: String,
    },
    Reprompt {
        notes: String,
    },
    Final {
        #[serde(skip_serializing_if = "Option::is_none")]
        notes: Option<String>,
    },
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        tool: Option<String>,
        error: String,
    },
}
