//! The tagged-union action protocol spoken between the executor and the
//! oracle: a tool invocation, a final answer, or an unparseable reply.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A single step the model asked to take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallAction {
    /// One of `search_docs` | `open_citation`.
    pub tool: String,
    /// Raw tool arguments, as a JSON object.
    pub input: serde_json::Map<String, serde_json::Value>,
}

/// A citation the model claims backs part of its answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsedCitationRef {
    pub doc_id: String,
    pub chunk_id: String,
    pub chunk_index: u32,
}

/// A gap the model reports it could not fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsufficiencyRef {
    pub section: String,
    pub missing: String,
    #[serde(default)]
    pub queries_tried: Vec<String>,
}

/// A proposed final answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalAction {
    pub answer: String,
    #[serde(default)]
    pub used_citations: Vec<UsedCitationRef>,
    #[serde(default)]
    pub insufficiencies: Vec<InsufficiencyRef>,
}

/// The parsed result of one oracle turn. `Invalid` is not an error type —
/// it is a normal, expected outcome of parsing free-form model output, and
/// the executor reacts to it the same way it reacts to any other action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    ToolCall(ToolCallAction),
    Final(FinalAction),
    #[serde(skip)]
    Invalid { reason: String },
}

impl Action {
    pub fn is_invalid(&self) -> bool {
        matches!(self, Action::Invalid { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn final_action_defaults_empty_collections() {
        let json = r#"{"answer":"hello"}"#;
        let parsed: FinalAction = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.answer, "hello");
        assert!(parsed.used_citations.is_empty());
        assert!(parsed.insufficiencies.is_empty());
    }
}
