//! Prompt Assembly (spec §4.6)
//!
//! Renders the oracle-facing prompt for one iteration of the loop: the
//! fixed system directive, the question/plan/current-step header, a
//! constraint summary, budget telemetry, the current retrieved context
//! (opened citations grouped by originating query, then bare search
//! hits), recent notes, and — when this iteration follows a failed
//! validation — a CORRECTION REQUIRED block. Grounded in the teacher's
//! fixed system prompt plus tool schema (`src/llm/contracts/prompts.rs`)
//! and its chat loop's rolling context window (`src/llm/chat_loop/chat_loop.rs`).

use agent_core::{AgentState, Constraints, RunConfig};

const SYSTEM_DIRECTIVE: &str = "You are a document-grounded research agent. Answer ONLY from the \
documents reachable through search_docs and open_citation. Never invent facts, commands, or \
configuration not present in retrieved text. When you have enough grounded evidence, respond with \
a `final` action citing every chunk you relied on by its citation number, e.g. [1]. When you need \
more evidence, respond with a `tool_call` action naming `search_docs` or `open_citation`. Always \
reply with exactly one JSON object and nothing else.";

/// Everything the prompt builder needs beyond the mutable state itself.
pub struct PromptContext<'a> {
    pub question: &'a str,
    pub plan_steps: &'a [String],
    pub current_step_index: usize,
    pub constraints: &'a Constraints,
    pub config: &'a RunConfig,
    pub correction: Option<&'a str>,
}

/// Assembles the full oracle prompt for the current iteration.
pub fn build_prompt(ctx: &PromptContext, state: &AgentState) -> String {
    let mut out = String::new();

    out.push_str(SYSTEM_DIRECTIVE);
    out.push_str("\n\n");

    out.push_str(&format!("QUESTION: {}\n\n", ctx.question));

    if !ctx.plan_steps.is_empty() {
        out.push_str("PLAN:\n");
        for (i, step) in ctx.plan_steps.iter().enumerate() {
            let marker = if i == ctx.current_step_index { ">" } else { " " };
            out.push_str(&format!("{marker} {}. {}\n", i + 1, step));
        }
        if let Some(current) = ctx.plan_steps.get(ctx.current_step_index) {
            out.push_str(&format!("\nCURRENT STEP: {current}\n"));
        }
        out.push('\n');
    }

    append_constraint_summary(&mut out, ctx.constraints);

    out.push_str(&format!(
        "BUDGET: {} tool calls remaining, {} distinct searches done, {} citations opened\n\n",
        ctx.config.max_tool_calls.saturating_sub(state.tool_calls_used),
        state.distinct_search_count(),
        state.open_citation_count(),
    ));

    append_context_block(&mut out, state, ctx.config.max_citation_text_for_llm);

    append_citation_table(&mut out, state);

    if !state.notes.is_empty() {
        out.push_str("NOTES:\n");
        for note in state.recent_notes() {
            out.push_str(&format!("- {note}\n"));
        }
        out.push('\n');
    }

    if let Some(correction) = ctx.correction {
        out.push_str("CORRECTION REQUIRED:\n");
        out.push_str(correction);
        out.push_str("\n\n");
    }

    out.push_str(
        "Respond now with exactly one JSON object: either a tool_call action or a final action.",
    );

    out
}

fn append_constraint_summary(out: &mut String, constraints: &Constraints) {
    let mut bullets = Vec::new();
    if constraints.min_searches > 1 {
        bullets.push(format!(
            "perform at least {} distinct searches",
            constraints.min_searches
        ));
    }
    if constraints.min_open_citations > 0 {
        bullets.push(format!(
            "open at least {} citation(s) before finalizing",
            constraints.min_open_citations
        ));
    }
    if constraints.requires_exact_quote {
        if constraints.exact_quote_indicators.is_empty() {
            bullets.push("include at least one exact, verbatim quote".to_string());
        } else {
            bullets.push(format!(
                "include an exact, verbatim quote of: {}",
                constraints.exact_quote_indicators.join(", ")
            ));
        }
    }
    if constraints.requires_conflict_resolution {
        let rule = constraints
            .conflict_resolution_rule
            .map(|r| format!("{r:?}").to_lowercase())
            .unwrap_or_else(|| "explicit".to_string());
        bullets.push(format!("resolve conflicting sources using the {rule} rule"));
    }
    if !constraints.required_sections.is_empty() {
        bullets.push(format!(
            "structure the final answer with sections: {}",
            constraints.required_sections.join(", ")
        ));
    }
    if constraints.requires_insufficiency_disclosure {
        bullets.push("explicitly disclose any required information that cannot be found".to_string());
    }

    if bullets.is_empty() {
        return;
    }

    out.push_str("CONSTRAINTS:\n");
    for b in bullets {
        out.push_str(&format!("- {b}\n"));
    }
    out.push('\n');
}

fn append_context_block(out: &mut String, state: &AgentState, max_citation_chars: usize) {
    if state.opened_citations.is_empty() && state.search_results.is_empty() {
        out.push_str("CURRENT CONTEXT: (none retrieved yet)\n\n");
        return;
    }

    out.push_str("CURRENT CONTEXT:\n");

    if !state.opened_citations.is_empty() {
        out.push_str("Opened citations:\n");
        for chunk in &state.opened_citations {
            let text = clip(&chunk.text, max_citation_chars);
            out.push_str(&format!(
                "[{}] {} (doc={}, chunk={}): {}\n",
                chunk.citation_num, chunk.filename, chunk.doc_id, chunk.chunk_id, text
            ));
        }
        out.push('\n');
    }

    if !state.search_results.is_empty() {
        out.push_str("Search hits by query:\n");
        for query in &state.search_queries {
            let hits: Vec<_> = state
                .search_results
                .iter()
                .filter(|h| &h.query == query)
                .collect();
            if hits.is_empty() {
                continue;
            }
            out.push_str(&format!("  \"{query}\":\n"));
            for hit in hits {
                out.push_str(&format!(
                    "    - {} (doc={}, chunk={}, score={:.2}): {}\n",
                    hit.filename, hit.doc_id, hit.chunk_id, hit.score, hit.snippet
                ));
            }
        }
        out.push('\n');
    }
}

/// Step 7 of spec §4.6: lists every citation number ever assigned this
/// run, not just the ones still in the rolling window, so the model can
/// cite a chunk whose text has since been evicted from CURRENT CONTEXT.
fn append_citation_table(out: &mut String, state: &AgentState) {
    if state.citation_history.is_empty() {
        return;
    }

    out.push_str("AVAILABLE CITATIONS FOR FINAL:\n");
    for chunk in &state.citation_history {
        out.push_str(&format!(
            "[{}] docId={} chunkId={} chunkIndex={} filename={}\n",
            chunk.citation_num, chunk.doc_id, chunk.chunk_id, chunk.chunk_index, chunk.filename
        ));
    }
    out.push('\n');
}

fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(max).collect::<String>())
    }
}
