//! Plan Generator (spec §4.2)
//!
//! Grounded in `src/llm/planner.rs`'s `parse_plan` cascade: try JSON first,
//! fall back through increasingly permissive text parsers, and never
//! fail the caller — an unparseable reply becomes the canonical fallback
//! plan instead of an error.

use agent_core::ports::{OracleClient, OracleMessage};
use std::sync::OnceLock;
use tracing::warn;

const PLANNER_TEMPERATURE: f32 = 0.3;
const MIN_STEP_LEN: usize = 5;
const MAX_STEP_LEN: usize = 500;
const MAX_STEPS: usize = 5;
const MIN_STEPS: usize = 2;

const FALLBACK_STEPS: &[&str] = &[
    "Search documents for relevant information",
    "Open the best matching citations",
    "Synthesize answer with citations",
];

const META_PREAMBLES: &[&str] = &["here is", "plan:", "i will"];

#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub steps: Vec<String>,
    pub is_fallback: bool,
}

impl Plan {
    fn fallback() -> Self {
        Self {
            steps: FALLBACK_STEPS.iter().map(|s| s.to_string()).collect(),
            is_fallback: true,
        }
    }
}

fn system_prompt() -> &'static str {
    "You are planning a short, bounded research procedure over the user's \
     own documents. Reply with a JSON array of 2 to 5 short imperative \
     steps (e.g. [\"Search for X\", \"Open the best match\", \"Synthesize\"]). \
     Output ONLY the JSON array, nothing else."
}

/// Ask the oracle for a 2-5 step plan; always returns a valid plan, even
/// if the oracle errors or replies with garbage.
pub async fn generate_plan(
    oracle: &dyn OracleClient,
    question: &str,
    max_tokens: u32,
) -> Plan {
    let messages = [
        OracleMessage::system(system_prompt()),
        OracleMessage::user(question),
    ];

    match oracle.chat(&messages, PLANNER_TEMPERATURE, max_tokens).await {
        Ok(reply) => parse_plan_reply(&reply),
        Err(e) => {
            warn!(error = %e, "plan oracle call failed; using fallback plan");
            Plan::fallback()
        }
    }
}

/// Pure parsing logic, split out from `generate_plan` so it is unit
/// testable without an oracle.
pub fn parse_plan_reply(reply: &str) -> Plan {
    let steps = try_json_array(reply)
        .or_else(|| try_numbered_list(reply))
        .or_else(|| try_bullet_list(reply))
        .unwrap_or_else(|| try_line_filter(reply));

    let cleaned = clean_steps(steps);

    if cleaned.len() < MIN_STEPS {
        warn!(reply_preview = %reply.chars().take(80).collect::<String>(), "could not parse a usable plan; using fallback plan");
        Plan::fallback()
    } else {
        Plan {
            steps: cleaned,
            is_fallback: false,
        }
    }
}

fn try_json_array(reply: &str) -> Option<Vec<String>> {
    let start = reply.find('[')?;
    let end = reply.rfind(']')?;
    if end <= start {
        return None;
    }
    let candidate = &reply[start..=end];
    let value: serde_json::Value = serde_json::from_str(candidate).ok()?;
    let arr = value.as_array()?;
    let steps: Vec<String> = arr
        .iter()
        .filter_map(|v| v.as_str().map(|s| s.to_string()))
        .collect();
    if steps.is_empty() {
        None
    } else {
        Some(steps)
    }
}

fn numbered_re() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"^\s*\d+[.)]\s*(.+)$").unwrap())
}

fn bullet_re() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"^\s*[-*\u{2022}]\s*(.+)$").unwrap())
}

fn try_numbered_list(reply: &str) -> Option<Vec<String>> {
    let steps: Vec<String> = reply
        .lines()
        .filter_map(|l| numbered_re().captures(l))
        .map(|c| c[1].trim().to_string())
        .collect();
    if steps.is_empty() {
        None
    } else {
        Some(steps)
    }
}

fn try_bullet_list(reply: &str) -> Option<Vec<String>> {
    let steps: Vec<String> = reply
        .lines()
        .filter_map(|l| bullet_re().captures(l))
        .map(|c| c[1].trim().to_string())
        .collect();
    if steps.is_empty() {
        None
    } else {
        Some(steps)
    }
}

fn try_line_filter(reply: &str) -> Vec<String> {
    reply
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .filter(|l| {
            let lower = l.to_lowercase();
            !META_PREAMBLES.iter().any(|p| lower.starts_with(p))
        })
        .map(|l| l.to_string())
        .collect()
}

fn clean_steps(steps: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = steps
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && s.len() >= MIN_STEP_LEN)
        .map(|s| {
            if s.chars().count() > MAX_STEP_LEN {
                let mut clipped: String = s.chars().take(MAX_STEP_LEN).collect();
                clipped.push_str("...");
                clipped
            } else {
                s
            }
        })
        .collect();
    out.truncate(MAX_STEPS);
    out
}
