//! Constraint Analyzer (spec §4.1)
//!
//! Pure function `question -> Constraints`. Never fails; worst case
//! returns defaults. Grounded in the teacher's regex-driven extraction
//! style (`src/llm/router.rs` / `odincode-agents`'s `regex` dependency),
//! generalized per spec §9's design note into a documented, ORDERED list
//! of `(pattern, extractor)` rules — order is part of the specification:
//! the numeric-first rule for `min_searches` must run before the
//! keyword-only rule.

use agent_core::{ConflictRule, Constraints};
use regex::Regex;
use std::sync::OnceLock;

fn quoted_spans_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""([^"]{3,50})"|'([^']{3,50})'|`([^`]{3,50})`"#).unwrap())
}

fn numeric_search_count_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:at least\s+)?(\d+)\s*(?:or more\s+)?(?:tool calls?|searches?|search)")
            .unwrap()
    })
}

fn open_citation_count_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)open\s+(?:the\s+)?(?:top\s+)?(\w+)\s+citations?|at least\s+(\w+)\s+citations?")
            .unwrap()
    })
}

fn required_sections_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:sections:|include sections:|output should include)\s*([^.\n]+)").unwrap()
    })
}

const SEPARATE_SEARCH_PHRASES: &[&str] = &[
    "separate searches",
    "search for each",
    "multiple searches",
];

const EXACT_QUOTE_PHRASES: &[&str] = &["verbatim", "word for word", "exact"];

const EXACT_QUOTE_CATEGORIES: &[(&str, &str)] = &[
    ("sql statement", "SQL statement"),
    ("redirect uri", "Redirect URI"),
    ("url configuration", "URL configuration"),
    ("command", "command"),
    ("configuration", "configuration"),
];

const OPEN_CITATION_TRIGGER_PHRASES: &[&str] = &[
    "must call open_citation",
    "retrieve full text",
    "read full text",
    "read detailed text",
];

const INSUFFICIENCY_PHRASES: &[&str] = &[
    "insufficient documentation",
    "explicitly state missing",
    "if not found",
    "if missing",
    "if unavailable",
    "list what was searched",
];

const COMPLEX_KEYWORDS: &[&str] = &[
    "runbook",
    "guide",
    "comprehensive",
    "authoritative",
    "detailed",
    "step-by-step",
    "checklist",
];

fn word_to_number(word: &str) -> Option<u32> {
    match word.to_ascii_lowercase().as_str() {
        "one" => Some(1),
        "two" => Some(2),
        "three" => Some(3),
        "four" => Some(4),
        "five" => Some(5),
        "six" => Some(6),
        "seven" => Some(7),
        "eight" => Some(8),
        "nine" => Some(9),
        "ten" => Some(10),
        _ => word.parse().ok(),
    }
}

/// Parses the user question into a structured `Constraints` record.
/// Rule order matters and is part of this function's contract: the
/// numeric `min_searches` rule runs before the bare-keyword fallback,
/// and the quoted-topic count is only used as a last resort.
pub fn analyze_constraints(question: &str) -> Constraints {
    let mut c = Constraints::default();
    if question.trim().is_empty() {
        return c;
    }
    let lower = question.to_lowercase();

    // --- required topics: quoted/backticked spans, length 3..50 -------
    for caps in quoted_spans_re().captures_iter(question) {
        let topic = caps
            .get(1)
            .or_else(|| caps.get(2))
            .or_else(|| caps.get(3))
            .map(|m| m.as_str().trim().to_string());
        if let Some(t) = topic {
            if !t.is_empty() {
                c.required_search_topics.push(t);
            }
        }
    }

    // --- min_searches: numeric-first rule, THEN keyword rule, THEN ----
    // --- quoted-topic count as last resort -----------------------------
    if let Some(caps) = numeric_search_count_re().captures(&lower) {
        if let Some(n) = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok()) {
            c.min_searches = n.max(2);
        }
    } else if SEPARATE_SEARCH_PHRASES.iter().any(|p| lower.contains(p)) {
        c.min_searches = 2;
    } else if !c.required_search_topics.is_empty() {
        c.min_searches = c
            .min_searches
            .max((c.required_search_topics.len() as u32).min(5));
    }

    // --- min_open_citations ---------------------------------------------
    if let Some(caps) = open_citation_count_re().captures(&lower) {
        let word = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str());
        if let Some(n) = word.and_then(word_to_number) {
            c.min_open_citations = n;
        }
    } else if OPEN_CITATION_TRIGGER_PHRASES.iter().any(|p| lower.contains(p)) {
        c.min_open_citations = 1;
    }

    // --- exact quote ------------------------------------------------------
    c.requires_exact_quote = EXACT_QUOTE_PHRASES.iter().any(|p| lower.contains(p));
    if c.requires_exact_quote {
        for (needle, label) in EXACT_QUOTE_CATEGORIES {
            if lower.contains(needle) {
                c.exact_quote_indicators.push((*label).to_string());
            }
        }
    }

    // --- conflict resolution ----------------------------------------------
    if lower.contains("newest") || lower.contains("most recent") || lower.contains("most-recent") {
        c.requires_conflict_resolution = true;
        c.conflict_resolution_rule = Some(ConflictRule::Newest);
    } else if lower.contains("highest priority") {
        c.requires_conflict_resolution = true;
        c.conflict_resolution_rule = Some(ConflictRule::Priority);
    } else if lower.contains("most specific") {
        c.requires_conflict_resolution = true;
        c.conflict_resolution_rule = Some(ConflictRule::Specific);
    }

    // --- required sections --------------------------------------------------
    if let Some(caps) = required_sections_re().captures(question) {
        if let Some(list) = caps.get(1) {
            c.required_sections = list
                .as_str()
                .split(|ch| ch == ',' || ch == ';')
                .flat_map(|s| s.split(" and "))
                .map(|s| s.trim().trim_end_matches('.').to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
    }

    // --- insufficiency disclosure -------------------------------------------
    c.requires_insufficiency_disclosure =
        INSUFFICIENCY_PHRASES.iter().any(|p| lower.contains(p));

    // --- complex query --------------------------------------------------------
    c.is_complex_query = !c.required_sections.is_empty()
        || c.min_searches > 2
        || COMPLEX_KEYWORDS.iter().any(|k| lower.contains(k));

    c
}
