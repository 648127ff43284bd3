//! Run-local hard budgets (spec §5). Grounded in
//! `src/execution_engine/safety_config.rs`'s `SafetyConfig` — same shape
//! (a flat struct of named limits with `Default`, a `restrictive()`
//! preset, and a `validate()`), generalized from tool-execution safety
//! limits to the agent run's own budget vocabulary.

use serde::{Deserialize, Serialize};

/// Hard, run-local resource budgets. None of these are retried or
/// renegotiated mid-run; when exhausted, the Executor moves to synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Total tool dispatches allowed, including safety auto-opens.
    pub max_tool_calls: u32,
    /// Total trips through the main executor loop.
    pub max_iterations: u32,
    /// Validator-triggered corrective attempts before best-effort accept.
    pub max_reprompts: u32,
    /// Rolling window size of opened chunks kept in the prompt.
    pub max_context_citations: usize,
    /// Per-chunk clip, in chars, for prompt display only.
    pub max_citation_text_for_llm: usize,
    /// Truncation threshold (not rejection) for the incoming question.
    pub max_question_length: usize,
    /// Oracle token budget for default-complexity questions.
    pub max_tokens_default: u32,
    /// Oracle token budget for `Constraints.is_complex_query` questions.
    pub max_tokens_complex: u32,
    /// Maximum bounded result count from a single `search_docs` call.
    pub max_search_results: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_tool_calls: 5,
            max_iterations: 10,
            max_reprompts: 3,
            max_context_citations: 5,
            max_citation_text_for_llm: 2000,
            max_question_length: 1000,
            max_tokens_default: 800,
            max_tokens_complex: 1600,
            max_search_results: 5,
        }
    }
}

impl RunConfig {
    /// A tighter configuration for safety-critical or load-tested
    /// deployments, mirroring `SafetyConfig::restrictive()`.
    pub fn restrictive() -> Self {
        Self {
            max_tool_calls: 3,
            max_iterations: 6,
            max_reprompts: 2,
            max_context_citations: 3,
            max_citation_text_for_llm: 1000,
            max_question_length: 500,
            max_tokens_default: 500,
            max_tokens_complex: 900,
            max_search_results: 3,
        }
    }

    /// Returns the token budget appropriate to the constraints derived
    /// for this run.
    pub fn token_budget_for(&self, is_complex: bool) -> u32 {
        if is_complex {
            self.max_tokens_complex
        } else {
            self.max_tokens_default
        }
    }

    /// Reject nonsensical configurations before they reach a live run.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_tool_calls == 0 {
            return Err("max_tool_calls must be > 0".into());
        }
        if self.max_iterations == 0 {
            return Err("max_iterations must be > 0".into());
        }
        if self.max_context_citations == 0 {
            return Err("max_context_citations must be > 0".into());
        }
        if self.max_tokens_default == 0 || self.max_tokens_complex == 0 {
            return Err("token budgets must be > 0".into());
        }
        if self.max_tokens_complex < self.max_tokens_default {
            return Err("max_tokens_complex must be >= max_tokens_default".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_budgets() {
        let c = RunConfig::default();
        assert_eq!(c.max_tool_calls, 5);
        assert_eq!(c.max_iterations, 10);
        assert_eq!(c.max_reprompts, 3);
        assert_eq!(c.max_context_citations, 5);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn restrictive_is_tighter_than_default() {
        let d = RunConfig::default();
        let r = RunConfig::restrictive();
        assert!(r.max_tool_calls < d.max_tool_calls);
        assert!(r.max_iterations < d.max_iterations);
        assert!(r.validate().is_ok());
    }

    #[test]
    fn token_budget_selects_by_complexity() {
        let c = RunConfig::default();
        assert_eq!(c.token_budget_for(false), c.max_tokens_default);
        assert_eq!(c.token_budget_for(true), c.max_tokens_complex);
    }

    #[test]
    fn validate_rejects_zero_tool_calls() {
        let c = RunConfig {
            max_tool_calls: 0,
            ..RunConfig::default()
        };
        assert!(c.validate().is_err());
    }
}
