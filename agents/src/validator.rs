//! Validator (spec §4.9)
//!
//! `(answer, bracket_refs, constraints, snapshot) -> ValidationResult`.
//! All checks are independent and run to completion; errors invalidate,
//! warnings don't. Grounded in
//! `src/execution_engine/preconditions.rs`'s "several independent checks,
//! each producing a typed failure" design, and in
//! `ExecutionError::GroundingRequired` — the teacher's own precedent for
//! "a claim must be grounded in retrieved evidence".

use std::collections::HashSet;
use std::sync::OnceLock;

use agent_core::{AgentState, Constraints};
use regex::Regex;

/// Operational hallucination bait: claims an LLM likes to assert with
/// confidence even when nothing in the retrieved corpus supports them.
const SUSPICIOUS_TERMS: &[&str] = &[
    "drop table",
    "truncate table",
    "vacuum analyze",
    "reindex",
    "delete from",
    "alter table",
    "grant all",
    "chmod 777",
    "rm -rf",
    "typically",
    "as recommended",
    "by default",
    "it is best practice",
];

const DONT_KNOW_PATTERNS: &[&str] = &[
    "i don't know",
    "i cannot find",
    "no relevant information",
];

const INSUFFICIENCY_ACK_PHRASES: &[&str] = &[
    "insufficient documentation",
    "not found in documents",
    "missing from documentation",
    "could not find",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    fn push_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
        self.is_valid = false;
    }

    fn push_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }
}

fn bracket_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[(\d+)\]").unwrap())
}

fn fenced_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```[a-zA-Z0-9]*\n?(.*?)```").unwrap())
}

fn inline_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"`([^`]+)`").unwrap())
}

fn double_quoted_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""([^"]{10,})""#).unwrap())
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extracts all `[n]` bracket markers appearing in `answer`.
pub fn extract_bracket_markers(answer: &str) -> Vec<u32> {
    bracket_marker_re()
        .captures_iter(answer)
        .filter_map(|c| c[1].parse::<u32>().ok())
        .collect()
}

/// Runs every independent check and accumulates the result. `snapshot` is
/// the `AgentState` as it stood at the moment the `Final` action was
/// proposed.
pub fn validate(answer: &str, constraints: &Constraints, snapshot: &AgentState) -> ValidationResult {
    let mut result = ValidationResult {
        is_valid: true,
        ..Default::default()
    };

    check_non_empty(answer, &mut result);
    check_unexplained_dont_know(answer, snapshot, &mut result);
    check_min_searches(constraints, snapshot, &mut result);
    check_min_opens(constraints, snapshot, &mut result);
    check_citation_references(answer, snapshot, &mut result);
    check_grounded_claims(answer, snapshot, &mut result);
    check_exact_quote(answer, constraints, snapshot, &mut result);
    check_insufficiency_disclosure(answer, constraints, snapshot, &mut result);

    result
}

fn check_non_empty(answer: &str, result: &mut ValidationResult) {
    if answer.trim().is_empty() {
        result.push_error("EMPTY_ANSWER: answer is empty or whitespace-only");
    }
}

fn check_unexplained_dont_know(answer: &str, snapshot: &AgentState, result: &mut ValidationResult) {
    let lower = answer.to_lowercase();
    let looks_like_dont_know =
        answer.len() < 100 && DONT_KNOW_PATTERNS.iter().any(|p| lower.contains(p));
    let had_sources = !snapshot.search_results.is_empty() || !snapshot.citation_history.is_empty();
    if looks_like_dont_know && had_sources {
        result.push_warning(
            "answer claims ignorance despite sources having been retrieved this run",
        );
    }
}

fn check_min_searches(constraints: &Constraints, snapshot: &AgentState, result: &mut ValidationResult) {
    if constraints.min_searches > 1
        && (snapshot.distinct_search_count() as u32) < constraints.min_searches
    {
        let shortfall = constraints.min_searches - snapshot.distinct_search_count() as u32;
        let expected: Vec<&str> = constraints
            .required_search_topics
            .iter()
            .take(3)
            .map(|s| s.as_str())
            .collect();
        result.push_error(format!(
            "MIN_SEARCHES_UNMET: {} more distinct search(es) required (have {}, need {}); expected topics: {:?}",
            shortfall,
            snapshot.distinct_search_count(),
            constraints.min_searches,
            expected
        ));
    }
}

fn check_min_opens(constraints: &Constraints, snapshot: &AgentState, result: &mut ValidationResult) {
    if constraints.min_open_citations > 0
        && (snapshot.open_citation_count() as u32) < constraints.min_open_citations
    {
        result.push_error(format!(
            "MIN_OPEN_CITATIONS_UNMET: have {} opened citation(s), need {}",
            snapshot.open_citation_count(),
            constraints.min_open_citations
        ));
    }
}

fn check_citation_references(answer: &str, snapshot: &AgentState, result: &mut ValidationResult) {
    let markers = extract_bracket_markers(answer);
    let valid: HashSet<u32> = snapshot
        .citation_history
        .iter()
        .map(|c| c.citation_num)
        .collect();
    let max_assigned = valid.iter().copied().max().unwrap_or(0);
    for m in markers {
        if m == 0 || m > max_assigned || !valid.contains(&m) {
            result.push_warning(format!(
                "HALLUCINATED_CITATION: marker [{m}] does not correspond to any opened citation"
            ));
        }
    }
}

fn check_grounded_claims(answer: &str, snapshot: &AgentState, result: &mut ValidationResult) {
    let mut corpus = String::new();
    for chunk in &snapshot.citation_history {
        corpus.push_str(&chunk.text);
        corpus.push(' ');
    }
    for hit in &snapshot.search_results {
        corpus.push_str(&hit.snippet);
        corpus.push(' ');
    }
    let corpus_lower = corpus.to_lowercase();
    let answer_lower = answer.to_lowercase();

    let present_terms: Vec<&str> = SUSPICIOUS_TERMS
        .iter()
        .filter(|t| answer_lower.contains(**t))
        .copied()
        .collect();

    if present_terms.is_empty() {
        return;
    }

    if corpus_lower.trim().is_empty() {
        result.push_error(
            "UNGROUNDED_CLAIM_NO_CONTEXT: answer asserts operational claims but no context was ever retrieved",
        );
        return;
    }

    let ungrounded: Vec<&str> = present_terms
        .into_iter()
        .filter(|t| !corpus_lower.contains(*t))
        .take(3)
        .collect();

    if !ungrounded.is_empty() {
        result.push_error(format!(
            "UNGROUNDED_CLAIM: terms not found in retrieved corpus: {ungrounded:?}"
        ));
    }
}

fn check_exact_quote(
    answer: &str,
    constraints: &Constraints,
    snapshot: &AgentState,
    result: &mut ValidationResult,
) {
    if !constraints.requires_exact_quote {
        return;
    }
    if snapshot.open_citation_count() == 0 {
        result.push_error("EXACT_QUOTE_REQUIRES_OPEN_CITATION: no chunks were opened");
        return;
    }

    let mut spans: Vec<String> = Vec::new();
    for caps in fenced_code_re().captures_iter(answer) {
        spans.push(caps[1].trim().to_string());
    }
    for caps in inline_code_re().captures_iter(answer) {
        spans.push(caps[1].trim().to_string());
    }
    for caps in double_quoted_re().captures_iter(answer) {
        spans.push(caps[1].trim().to_string());
    }
    spans.retain(|s| !s.is_empty());

    if spans.is_empty() {
        result.push_warning("no quoted span found even though an exact quote was required");
        return;
    }

    let corpus: String = snapshot
        .citation_history
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let corpus_collapsed = collapse_whitespace(&corpus);

    let any_verbatim = spans.iter().any(|span| {
        corpus.contains(span.as_str()) || corpus_collapsed.contains(&collapse_whitespace(span))
    });

    if !any_verbatim {
        result.push_warning(
            "quoted span in the answer does not appear verbatim (even whitespace-collapsed) in the opened corpus",
        );
    }
}

fn check_insufficiency_disclosure(
    answer: &str,
    constraints: &Constraints,
    snapshot: &AgentState,
    result: &mut ValidationResult,
) {
    if !constraints.requires_insufficiency_disclosure {
        return;
    }
    let known_gaps = !snapshot.insufficiencies.is_empty();
    if !known_gaps {
        return;
    }
    let lower = answer.to_lowercase();
    let disclosed = INSUFFICIENCY_ACK_PHRASES.iter().any(|p| lower.contains(p));
    if !disclosed {
        result.push_warning(
            "known gaps exist but the answer does not disclose any insufficiency",
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::state::Insufficiency;

    fn snapshot_with_opened(text: &str) -> AgentState {
        let mut s = AgentState::new();
        s.record_opened_chunk(
            "doc-1".into(),
            "chunk-1".into(),
            0,
            text.to_string(),
            "file.txt".into(),
            5,
        );
        s
    }

    #[test]
    fn empty_answer_is_invalid() {
        let result = validate("   ", &Constraints::default(), &AgentState::new());
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.contains("EMPTY_ANSWER")));
    }

    #[test]
    fn min_searches_unmet_is_an_error() {
        let constraints = Constraints {
            min_searches: 3,
            ..Constraints::default()
        };
        let mut state = AgentState::new();
        state.record_search("reindex sql".into(), vec![]);
        let result = validate("Use pg_reindex.", &constraints, &state);
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.contains("MIN_SEARCHES_UNMET")));
    }

    #[test]
    fn min_opens_unmet_is_an_error() {
        let constraints = Constraints {
            min_open_citations: 2,
            ..Constraints::default()
        };
        let result = validate("answer", &constraints, &AgentState::new());
        assert!(result.errors.iter().any(|e| e.contains("MIN_OPEN_CITATIONS_UNMET")));
    }

    #[test]
    fn valid_citation_markers_pass() {
        let state = snapshot_with_opened("some opened text");
        let result = validate("Based on [1] here.", &Constraints::default(), &state);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn hallucinated_marker_is_a_warning_not_error() {
        let state = snapshot_with_opened("some opened text");
        let result = validate("See [1] and [3].", &Constraints::default(), &state);
        assert!(result.warnings.iter().any(|w| w.contains("HALLUCINATED_CITATION")));
        // A hallucinated marker alone does not invalidate the answer.
        assert!(result.is_valid);
    }

    #[test]
    fn ungrounded_claim_with_no_context_is_an_error() {
        let result = validate(
            "Run vacuum analyze on the table.",
            &Constraints::default(),
            &AgentState::new(),
        );
        assert!(result.errors.iter().any(|e| e.contains("UNGROUNDED_CLAIM_NO_CONTEXT")));
    }

    #[test]
    fn ungrounded_claim_with_unrelated_context_is_an_error() {
        let state = snapshot_with_opened("the redirect uri is https://example.com/callback");
        let result = validate(
            "You should run vacuum analyze regularly.",
            &Constraints::default(),
            &state,
        );
        assert!(result.errors.iter().any(|e| e.contains("UNGROUNDED_CLAIM")));
    }

    #[test]
    fn grounded_claim_passes() {
        let state = snapshot_with_opened("the fix is to reindex the users table nightly");
        let result = validate("The fix is to reindex the users table.", &Constraints::default(), &state);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn exact_quote_without_opens_is_an_error() {
        let constraints = Constraints {
            requires_exact_quote: true,
            ..Constraints::default()
        };
        let result = validate("The SQL is `SELECT 1`.", &constraints, &AgentState::new());
        assert!(result.errors.iter().any(|e| e.contains("EXACT_QUOTE_REQUIRES_OPEN_CITATION")));
    }

    #[test]
    fn exact_quote_verbatim_in_corpus_has_no_warning() {
        let constraints = Constraints {
            requires_exact_quote: true,
            ..Constraints::default()
        };
        let state = snapshot_with_opened("run REINDEX TABLE users; to fix corruption");
        let result = validate(
            "The exact command is `REINDEX TABLE users;`.",
            &constraints,
            &state,
        );
        assert!(!result.warnings.iter().any(|w| w.contains("verbatim")));
    }

    #[test]
    fn exact_quote_not_found_is_a_warning() {
        let constraints = Constraints {
            requires_exact_quote: true,
            ..Constraints::default()
        };
        let state = snapshot_with_opened("completely unrelated text");
        let result = validate("The exact command is `REINDEX TABLE users;`.", &constraints, &state);
        assert!(result.warnings.iter().any(|w| w.contains("verbatim")));
    }

    #[test]
    fn insufficiency_disclosure_required_but_missing_warns() {
        let constraints = Constraints {
            requires_insufficiency_disclosure: true,
            ..Constraints::default()
        };
        let mut state = AgentState::new();
        state.insufficiencies.push(Insufficiency {
            section: "Steps".into(),
            missing: "rollback procedure".into(),
            queries_tried: vec!["rollback".into()],
        });
        let result = validate("Here is the answer.", &constraints, &state);
        assert!(result.warnings.iter().any(|w| w.contains("insufficiency")));
    }

    #[test]
    fn insufficiency_disclosed_has_no_warning() {
        let constraints = Constraints {
            requires_insufficiency_disclosure: true,
            ..Constraints::default()
        };
        let mut state = AgentState::new();
        state.insufficiencies.push(Insufficiency {
            section: "Steps".into(),
            missing: "rollback procedure".into(),
            queries_tried: vec![],
        });
        let result = validate(
            "The rollback procedure is not found in documents.",
            &constraints,
            &state,
        );
        assert!(!result.warnings.iter().any(|w| w.contains("insufficiency")));
    }

    #[test]
    fn extract_bracket_markers_finds_all() {
        let markers = extract_bracket_markers("See [1], [2] and also [10].");
        assert_eq!(markers, vec![1, 2, 10]);
    }
}
