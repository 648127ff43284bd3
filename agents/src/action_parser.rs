//! Action Parser (spec §4.3)
//!
//! `modelOutput -> ParsedAction`. Never panics. Grounded in
//! `src/llm/tool_call.rs`'s "find the marker, slice out the block, parse,
//! tolerate surrounding prose" shape, retargeted from the teacher's
//! YAML-ish `TOOL_CALL:` block to balanced-brace JSON extraction per
//! this spec's action protocol.

use agent_core::action::{Action, FinalAction, ToolCallAction};

const VALID_TOOLS: &[&str] = &["search_docs", "open_citation"];

/// Finds the first balanced `{...}` span in `text`, scanning byte-by-byte
/// and tracking brace depth (so nested JSON objects inside the action
/// don't end the span early). Returns `None` if braces never balance.
fn first_balanced_object(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let start = text.find('{')?;
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parses the first JSON action object found in free-form model output.
/// Models frequently wrap JSON in prose; a strict "JSON-first-and-only"
/// parser would waste tool-budget retries on otherwise-fine replies, so
/// this scans for the first balanced brace span instead of requiring the
/// whole reply to be JSON (spec §4.3 rationale).
pub fn parse_action(model_output: &str) -> Action {
    let Some(span) = first_balanced_object(model_output) else {
        return Action::Invalid {
            reason: "no JSON object found in model output".to_string(),
        };
    };

    let value: serde_json::Value = match serde_json::from_str(span) {
        Ok(v) => v,
        Err(e) => {
            return Action::Invalid {
                reason: format!("Invalid JSON: {e}"),
            }
        }
    };

    let Some(obj) = value.as_object() else {
        return Action::Invalid {
            reason: "top-level JSON value is not an object".to_string(),
        };
    };

    let declared_type = obj.get("type").and_then(|t| t.as_str());

    match declared_type {
        Some("tool_call") => parse_tool_call(obj),
        Some("final") => parse_final(obj),
        Some(other) => Action::Invalid {
            reason: format!("unknown action type: {other}"),
        },
        None => {
            // type omitted: infer from structure (spec §4.3 step 5).
            if obj.contains_key("tool") && obj.contains_key("input") {
                parse_tool_call(obj)
            } else if obj.contains_key("answer") {
                parse_final(obj)
            } else {
                Action::Invalid {
                    reason: "could not infer action type from structure".to_string(),
                }
            }
        }
    }
}

fn parse_tool_call(obj: &serde_json::Map<String, serde_json::Value>) -> Action {
    let Some(tool) = obj.get("tool").and_then(|t| t.as_str()) else {
        return Action::Invalid {
            reason: "tool_call missing string field 'tool'".to_string(),
        };
    };
    if !VALID_TOOLS.contains(&tool) {
        return Action::Invalid {
            reason: format!("unknown tool: {tool}"),
        };
    }
    let Some(input) = obj.get("input").and_then(|i| i.as_object()) else {
        return Action::Invalid {
            reason: "tool_call missing object field 'input'".to_string(),
        };
    };

    Action::ToolCall(ToolCallAction {
        tool: tool.to_string(),
        input: input.clone(),
    })
}

fn parse_final(obj: &serde_json::Map<String, serde_json::Value>) -> Action {
    let Some(answer) = obj.get("answer").and_then(|a| a.as_str()) else {
        return Action::Invalid {
            reason: "final action missing string field 'answer'".to_string(),
        };
    };

    // `citations` is an accepted alias for `used_citations`.
    let citations_value = obj
        .get("used_citations")
        .or_else(|| obj.get("citations"))
        .cloned()
        .unwrap_or(serde_json::Value::Array(Vec::new()));
    let used_citations = serde_json::from_value(citations_value).unwrap_or_default();

    let insufficiencies_value = obj
        .get("insufficiencies")
        .cloned()
        .unwrap_or(serde_json::Value::Array(Vec::new()));
    let insufficiencies = serde_json::from_value(insufficiencies_value).unwrap_or_default();

    Action::Final(FinalAction {
        answer: answer.to_string(),
        used_citations,
        insufficiencies,
    })
}
