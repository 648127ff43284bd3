//! Opaque-identifier resolution (spec §4.4).
//!
//! Models frequently echo back a `doc_id`/`chunk_id` that isn't a
//! byte-for-byte match for what `search_docs` returned — a truncated
//! UUID, a copy-paste missing its last segment, or a prefix the model
//! decided was "close enough". Rather than hard-failing these with
//! `ToolError::Validation`, `open_citation` resolves the candidate
//! against the set of ids the model has actually seen this run, the same
//! way the teacher's execution engine resolves a loosely specified
//! target against a known-good set before acting (grounded in
//! `src/execution_engine/preconditions.rs`'s "check against what's known,
//! not what's asserted" pattern).

/// Minimum candidate length before a substring match is attempted at all
/// (spec §4.4: "for strings of length >= 12 with no prefix match").
const MIN_SUBSTRING_CANDIDATE_LEN: usize = 12;

/// Resolves `candidate` against `known`, in order of strictness:
/// 1. Case-insensitive exact match.
/// 2. Unique prefix match (candidate is a prefix of exactly one known id).
/// 3. For candidates of length >= 12 with no prefix match: unique
///    substring match (candidate appears anywhere in exactly one known
///    id — covers a model dropping a leading or trailing fragment).
///
/// Returns `None` if no known id matches, or if more than one would —
/// an ambiguous resolution is refused rather than guessed.
pub fn resolve_id<'a>(candidate: &str, known: &[&'a str]) -> Option<&'a str> {
    if candidate.is_empty() {
        return None;
    }

    if let Some(&exact) = known.iter().find(|k| k.eq_ignore_ascii_case(candidate)) {
        return Some(exact);
    }

    let prefix_matches: Vec<&&str> = known.iter().filter(|k| k.starts_with(candidate)).collect();
    if prefix_matches.len() == 1 {
        return Some(prefix_matches[0]);
    }

    if candidate.len() >= MIN_SUBSTRING_CANDIDATE_LEN {
        let substring_matches: Vec<&&str> =
            known.iter().filter(|k| k.contains(candidate)).collect();
        if substring_matches.len() == 1 {
            return Some(substring_matches[0]);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_wins_immediately() {
        let known = vec!["doc-abc123", "doc-def456"];
        assert_eq!(resolve_id("doc-abc123", &known), Some("doc-abc123"));
    }

    #[test]
    fn unique_prefix_resolves() {
        let known = vec!["a1b2c3d4-full-uuid", "z9y8x7w6-other-uuid"];
        assert_eq!(resolve_id("a1b2c3d4", &known), Some("a1b2c3d4-full-uuid"));
    }

    #[test]
    fn ambiguous_prefix_refuses_to_guess() {
        let known = vec!["doc-abc-1", "doc-abc-2"];
        assert_eq!(resolve_id("doc-abc", &known), None);
    }

    #[test]
    fn unique_substring_resolves_for_longer_candidates() {
        let known = vec!["prefix-a1b2c3d4e5f6-suffix", "prefix-z9y8x7w6v5u4-suffix"];
        assert_eq!(
            resolve_id("a1b2c3d4e5f6", &known),
            Some("prefix-a1b2c3d4e5f6-suffix")
        );
    }

    #[test]
    fn short_candidate_does_not_attempt_substring_match() {
        // "abc" is short enough that it never reaches the substring step,
        // and it is not a prefix of "xyzabcdef" either, so it stays unresolved.
        let known = vec!["xyzabcdef"];
        assert_eq!(resolve_id("abc", &known), None);
    }

    #[test]
    fn case_insensitive_exact_match() {
        let known = vec!["Doc-ABC123"];
        assert_eq!(resolve_id("doc-abc123", &known), Some("Doc-ABC123"));
    }

    #[test]
    fn empty_candidate_never_matches() {
        let known = vec!["doc-1"];
        assert_eq!(resolve_id("", &known), None);
    }

    #[test]
    fn no_match_returns_none() {
        let known = vec!["doc-1", "doc-2"];
        assert_eq!(resolve_id("doc-9", &known), None);
    }
}
