//! Constraints derived once from the user question.
//!
//! This is a plain data record. The extraction rules that populate it live
//! in `agent-brain::constraint_analyzer` — this module only defines the
//! shape and its no-op-safe default.

use serde::{Deserialize, Serialize};

/// How the agent should resolve conflicting information across documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictRule {
    /// Prefer the most recently dated source.
    Newest,
    /// Prefer the source with the highest stated priority.
    Priority,
    /// Prefer the most specific source over a general one.
    Specific,
}

/// Requirements the agent must satisfy for a given question, derived once
/// at run start by the Constraint Analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    /// Lower bound on distinct search queries.
    pub min_searches: u32,
    /// Quoted/named topics extracted from the prompt. Informational only;
    /// never enforced verbatim.
    pub required_search_topics: Vec<String>,
    /// Lower bound on distinct chunks that must be opened before finalizing.
    pub min_open_citations: u32,
    /// Whether the answer must contain an exact, verbatim quote.
    pub requires_exact_quote: bool,
    /// Categories of thing the exact quote is expected to be (e.g. "SQL
    /// statement", "Redirect URI").
    pub exact_quote_indicators: Vec<String>,
    /// Whether the answer must resolve conflicting information explicitly.
    pub requires_conflict_resolution: bool,
    /// The rule to use when resolving conflicts, if specified.
    pub conflict_resolution_rule: Option<ConflictRule>,
    /// Names of sections the output must contain.
    pub required_sections: Vec<String>,
    /// Whether missing information must be explicitly disclosed.
    pub requires_insufficiency_disclosure: bool,
    /// Drives which oracle token budget is selected.
    pub is_complex_query: bool,
}

impl Default for Constraints {
    /// Worst-case defaults: never fails, never over-constrains.
    fn default() -> Self {
        Self {
            min_searches: 1,
            required_search_topics: Vec::new(),
            min_open_citations: 0,
            requires_exact_quote: false,
            exact_quote_indicators: Vec::new(),
            requires_conflict_resolution: false,
            conflict_resolution_rule: None,
            required_sections: Vec::new(),
            requires_insufficiency_disclosure: false,
            is_complex_query: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_permissive() {
        let c = Constraints::default();
        assert_eq!(c.min_searches, 1);
        assert_eq!(c.min_open_citations, 0);
        assert!(!c.requires_exact_quote);
        assert!(!c.is_complex_query);
        assert!(c.required_search_topics.is_empty());
    }

    #[test]
    fn round_trips_through_json() {
        let c = Constraints {
            min_searches: 3,
            conflict_resolution_rule: Some(ConflictRule::Newest),
            ..Constraints::default()
        };
        let json = serde_json::to_string(&c).unwrap();
        let back: Constraints = serde_json::from_str(&json).unwrap();
        assert_eq!(c, back);
    }
}
