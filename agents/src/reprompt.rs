//! Reprompt Builder (spec §4.8)
//!
//! `(ValidationResult, remaining_budget) -> correction text`, consumed by
//! `prompt::build_prompt`'s `correction` slot. Grounded in the teacher's
//! `ExecutionError`-to-retry-message mapping in
//! `src/llm/chat_loop/chat_loop.rs`: a failed precondition becomes a
//! short, imperative correction fed back into the next oracle call
//! rather than an opaque retry.

use crate::validator::ValidationResult;

/// Remaining budget figures the reprompt banner should surface so the
/// model understands how much runway is left.
pub struct RemainingBudget {
    pub tool_calls_left: u32,
    pub reprompts_left: u32,
}

/// Builds the `CORRECTION REQUIRED` block body for the next prompt.
/// Only called when `result.is_valid` is false — a valid answer with
/// warnings is accepted as-is (spec §4.9).
pub fn build_reprompt(result: &ValidationResult, remaining: &RemainingBudget) -> String {
    let mut out = String::new();
    out.push_str("VALIDATION FAILED. Your proposed final answer was rejected:\n");
    for err in &result.errors {
        out.push_str(&format!("- {err}\n"));
    }
    if !result.warnings.is_empty() {
        out.push_str("Additional concerns (not blocking, but address if possible):\n");
        for warn in &result.warnings {
            out.push_str(&format!("- {warn}\n"));
        }
    }

    out.push_str(&format!(
        "\nRemaining budget: {} tool call(s), {} reprompt attempt(s).\n",
        remaining.tool_calls_left, remaining.reprompts_left
    ));

    if remaining.tool_calls_left > 0 {
        out.push_str(
            "You may issue another tool_call to gather what is missing, or submit a corrected \
             final action if you already have enough grounded evidence.",
        );
    } else {
        out.push_str(
            "Your tool-call budget is exhausted. You must submit a final action now, disclosing \
             any requirement you could not satisfy rather than inventing information. For each \
             requirement you cannot meet, add an entry to the final action's `insufficiencies` \
             array naming the section, what is missing, and the queries you already tried.",
        );
    }

    out
}
