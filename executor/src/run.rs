//! Executor: `PLANNING -> LOOPING -> (accepted final | synthesis
//! fallback)`. The only stateful driver in this crate family —
//! everything in `agent-brain` is a pure function of its inputs; this
//! module is what actually calls them in sequence against live
//! `OracleClient`/`ToolClient` implementations, mutating one run-local
//! `AgentState` as it goes. Drives the same render-prompt /
//! call-model / parse / act / validate cycle around a bounded budget
//! as a conversational chat loop, generalized to a multi-step agent
//! run instead of a single turn.

use agent_brain::{
    analyze_constraints, build_prompt, build_reprompt, generate_plan, ground_citations,
    parse_action, validate, PromptContext, RemainingBudget,
};
use agent_core::ports::{OracleClient, OracleMessage, ToolClient};
use agent_core::{
    Action, AgentState, Constraints, CoreError, FinalAction, GroundedCitation, Insufficiency,
    RunConfig, SearchHit, ToolCallAction, TraceEntry,
};

use tracing::{debug, info, warn};

use crate::dispatch::{dispatch_open, dispatch_search, DispatchOutcome};
use crate::error::ExecutorError;
use crate::sink::EventSink;

/// Planner uses ~0.3 (handled inside `generate_plan`); tool/final
/// emission and synthesis run colder so the validator's paraphrase
/// tolerance still holds.
const TOOL_FINAL_TEMPERATURE: f32 = 0.1;
const SYNTHESIS_TEMPERATURE: f32 = 0.15;

/// Two consecutive unparseable replies exits the loop into synthesis.
const MAX_JSON_ERRORS: u32 = 2;

/// Safety auto-open: up to 3 top search hits.
const SAFETY_AUTO_OPEN_COUNT: usize = 3;

/// What one run produces: the grounded answer, the citations that back
/// it, and any disclosed gaps.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub answer: String,
    pub citations: Vec<GroundedCitation>,
    pub insufficiencies: Vec<Insufficiency>,
}

/// Runs one bounded agent turn end to end. `question` is truncated (not
/// rejected) at `config.max_question_length`; only an empty question is
/// an error. Every trace entry is emitted through `sink` as it happens.
pub async fn run(
    question: &str,
    user_id: &str,
    oracle: &dyn OracleClient,
    tool: &dyn ToolClient,
    config: &RunConfig,
    sink: &mut dyn EventSink,
) -> Result<RunOutcome, ExecutorError> {
    let trimmed = question.trim();
    if trimmed.is_empty() {
        return Err(CoreError::EmptyQuestion.into());
    }
    debug!(user_id, question_len = trimmed.chars().count(), "starting agent run");
    let was_truncated = trimmed.chars().count() > config.max_question_length;
    let question: String = if was_truncated {
        trimmed.chars().take(config.max_question_length).collect()
    } else {
        trimmed.to_string()
    };

    let constraints = analyze_constraints(&question);
    let plan = generate_plan(
        oracle,
        &question,
        config.token_budget_for(constraints.is_complex_query),
    )
    .await;
    let plan_notes = match (was_truncated, plan.is_fallback) {
        (true, true) => Some(format!(
            "question truncated to {} chars; fallback plan used",
            config.max_question_length
        )),
        (true, false) => Some(format!(
            "question truncated to {} chars",
            config.max_question_length
        )),
        (false, true) => Some("fallback plan used".to_string()),
        (false, false) => None,
    };
    if plan.is_fallback {
        warn!("plan generation fell back to the default 3-step plan");
    }
    sink.emit(TraceEntry::Plan {
        steps: plan.steps.clone(),
        notes: plan_notes,
    })
    .await;

    let mut state = AgentState::new();
    let mut reprompt_text: Option<String> = None;
    let mut reprompt_count: u32 = 0;
    let mut json_error_count: u32 = 0;
    let mut current_step: usize = 0;
    let mut accepted: Option<FinalAction> = None;

    let mut i: u32 = 0;
    while i < config.max_iterations && state.tool_calls_used < config.max_tool_calls {
        i += 1;

        let ctx = PromptContext {
            question: &question,
            plan_steps: &plan.steps,
            current_step_index: current_step.min(plan.steps.len().saturating_sub(1)),
            constraints: &constraints,
            config,
            correction: reprompt_text.as_deref(),
        };
        let prompt = build_prompt(&ctx, &state);
        reprompt_text = None;

        let messages = [OracleMessage::user(prompt)];
        let token_budget = config.token_budget_for(constraints.is_complex_query);
        let reply = match oracle
            .chat(&messages, TOOL_FINAL_TEMPERATURE, token_budget)
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, iteration = i, "oracle transport error; exiting loop");
                sink.emit(TraceEntry::Error {
                    tool: None,
                    error: format!("oracle transport error: {e}"),
                })
                .await;
                break;
            }
        };

        match parse_action(&reply) {
            Action::Invalid { reason } => {
                json_error_count += 1;
                sink.emit(TraceEntry::Error {
                    tool: None,
                    error: format!("invalid action: {reason}"),
                })
                .await;
                if json_error_count >= MAX_JSON_ERRORS {
                    break;
                }
                reprompt_text = Some(format!("Invalid JSON: {reason}. Output ONLY valid JSON."));
                continue;
            }
            Action::ToolCall(tc) => {
                if state.tool_calls_used >= config.max_tool_calls {
                    break;
                }
                current_step = (current_step + 1).min(plan.steps.len().saturating_sub(1));
                dispatch_one_tool_call(tool, &mut state, user_id, &tc, config, sink).await;
                continue;
            }
            Action::Final(final_action) => {
                if state.citation_history.is_empty()
                    && !state.search_results.is_empty()
                    && state.tool_calls_used < config.max_tool_calls
                {
                    let opened = safety_auto_open(tool, &mut state, user_id, config, sink).await;
                    reprompt_text = Some(format!(
                        "I have now opened {opened} citation(s) for you. Review the OPENED \
                         CITATIONS section and provide a proper answer with markers [1], [2], ..."
                    ));
                    continue;
                }

                let result = validate(&final_action.answer, &constraints, &state);

                if result.is_valid {
                    info!(iteration = i, "final answer accepted");
                    sink.emit(TraceEntry::Final { notes: None }).await;
                    accepted = Some(final_action);
                    break;
                }

                reprompt_count += 1;
                debug!(
                    reprompt_count,
                    max_reprompts = config.max_reprompts,
                    errors = ?result.errors,
                    "validation rejected final answer"
                );
                sink.emit(TraceEntry::Validation {
                    validation_errors: result.errors.clone(),
                    notes: format!("reprompt {reprompt_count}/{}", config.max_reprompts),
                })
                .await;

                if reprompt_count >= config.max_reprompts {
                    sink.emit(TraceEntry::Final {
                        notes: Some(
                            "Accepted after max reprompts (may have validation issues)"
                                .to_string(),
                        ),
                    })
                    .await;
                    accepted = Some(final_action);
                    break;
                }

                let remaining = RemainingBudget {
                    tool_calls_left: config.max_tool_calls.saturating_sub(state.tool_calls_used),
                    reprompts_left: config.max_reprompts.saturating_sub(reprompt_count),
                };
                let correction = build_reprompt(&result, &remaining);
                sink.emit(TraceEntry::Reprompt {
                    notes: correction.clone(),
                })
                .await;
                reprompt_text = Some(correction);
            }
        }
    }

    match accepted {
        Some(final_action) => {
            let grounding =
                ground_citations(&final_action.answer, &final_action.used_citations, &state);
            let insufficiencies = merge_insufficiencies(&state, &final_action);
            Ok(RunOutcome {
                answer: grounding.cleaned_answer,
                citations: grounding.citations,
                insufficiencies,
            })
        }
        None => synthesize(&question, &constraints, oracle, &state, config, sink).await,
    }
}

async fn dispatch_one_tool_call(
    tool: &dyn ToolClient,
    state: &mut AgentState,
    user_id: &str,
    action: &ToolCallAction,
    config: &RunConfig,
    sink: &mut dyn EventSink,
) {
    match action.tool.as_str() {
        "search_docs" => {
            let query = action
                .input
                .get("query")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            let input = serde_json::json!({ "query": query });
            let outcome =
                dispatch_search(tool, state, user_id, &query, config.max_search_results).await;
            emit_dispatch_trace(sink, state, "search_docs", input, outcome).await;
        }
        "open_citation" => {
            let doc_id = action
                .input
                .get("docId")
                .or_else(|| action.input.get("doc_id"))
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            let chunk_id = action
                .input
                .get("chunkId")
                .or_else(|| action.input.get("chunk_id"))
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            let input = serde_json::json!({ "docId": doc_id, "chunkId": chunk_id });
            let outcome = dispatch_open(
                tool,
                state,
                user_id,
                &doc_id,
                &chunk_id,
                config.max_citation_text_for_llm,
                config.max_context_citations,
            )
            .await;
            emit_dispatch_trace(sink, state, "open_citation", input, outcome).await;
        }
        other => {
            // The Action Parser only produces a ToolCall for a tool name
            // it already validated; this arm exists for exhaustiveness.
            warn!(tool = other, "dispatch received an unrecognized tool name");
            state.push_note(format!("unknown tool: {other}"));
            sink.emit(TraceEntry::Error {
                tool: Some(other.to_string()),
                error: format!("unknown tool: {other}"),
            })
            .await;
        }
    }
}

async fn emit_dispatch_trace(
    sink: &mut dyn EventSink,
    state: &mut AgentState,
    tool: &str,
    input: serde_json::Value,
    outcome: DispatchOutcome,
) {
    match outcome {
        DispatchOutcome::Searched { query, hit_count } => {
            sink.emit(TraceEntry::ToolCall {
                tool: tool.to_string(),
                input: Some(input),
                output_summary: Some(format!("{hit_count} hit(s) for \"{query}\"")),
            })
            .await;
        }
        DispatchOutcome::Opened {
            citation_num,
            doc_id,
            chunk_id,
        } => {
            sink.emit(TraceEntry::ToolCall {
                tool: tool.to_string(),
                input: Some(input),
                output_summary: Some(format!(
                    "opened as [{citation_num}] (doc={doc_id}, chunk={chunk_id})"
                )),
            })
            .await;
        }
        DispatchOutcome::Error { message } => {
            state.push_note(format!("{tool} failed: {message}"));
            sink.emit(TraceEntry::Error {
                tool: Some(tool.to_string()),
                error: message,
            })
            .await;
        }
    }
}

/// Opens up to `SAFETY_AUTO_OPEN_COUNT` top-scoring search hits when the
/// model tries to finalize before ever calling `open_citation` (spec
/// §4.5, §9 "Safety auto-open"). Counts against the tool budget.
async fn safety_auto_open(
    tool: &dyn ToolClient,
    state: &mut AgentState,
    user_id: &str,
    config: &RunConfig,
    sink: &mut dyn EventSink,
) -> usize {
    let mut candidates: Vec<SearchHit> = state.search_results.clone();
    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    let mut opened = 0usize;
    for hit in candidates.into_iter().take(SAFETY_AUTO_OPEN_COUNT) {
        if state.tool_calls_used >= config.max_tool_calls {
            break;
        }
        let outcome = dispatch_open(
            tool,
            state,
            user_id,
            &hit.doc_id,
            &hit.chunk_id,
            config.max_citation_text_for_llm,
            config.max_context_citations,
        )
        .await;
        let input = serde_json::json!({ "docId": hit.doc_id, "chunkId": hit.chunk_id });
        let was_opened = matches!(outcome, DispatchOutcome::Opened { .. });
        emit_dispatch_trace(sink, state, "open_citation", input, outcome).await;
        if was_opened {
            opened += 1;
        }
    }
    opened
}

fn merge_insufficiencies(state: &AgentState, final_action: &FinalAction) -> Vec<Insufficiency> {
    let mut merged = state.insufficiencies.clone();
    for ins in &final_action.insufficiencies {
        merged.push(Insufficiency {
            section: ins.section.clone(),
            missing: ins.missing.clone(),
            queries_tried: ins.queries_tried.clone(),
        });
    }
    merged
}

/// Spec §4.7: reached when the loop exits without an accepted `Final`.
async fn synthesize(
    question: &str,
    constraints: &Constraints,
    oracle: &dyn OracleClient,
    state: &AgentState,
    config: &RunConfig,
    sink: &mut dyn EventSink,
) -> Result<RunOutcome, ExecutorError> {
    if state.search_results.is_empty() && state.citation_history.is_empty() {
        info!("synthesis reached with no context at all; returning literal fallback");
        sink.emit(TraceEntry::Final {
            notes: Some("no context retrieved; returning literal fallback".to_string()),
        })
        .await;
        return Ok(RunOutcome {
            answer: "I don't know based on the provided documents.".to_string(),
            citations: Vec::new(),
            insufficiencies: state.insufficiencies.clone(),
        });
    }

    let prompt = build_synthesis_prompt(question, state);
    let messages = [OracleMessage::user(prompt)];
    let token_budget = config.token_budget_for(constraints.is_complex_query);
    let reply = match oracle.chat(&messages, SYNTHESIS_TEMPERATURE, token_budget).await {
        Ok(r) => r,
        Err(e) => {
            sink.emit(TraceEntry::Error {
                tool: None,
                error: format!("oracle transport error during synthesis: {e}"),
            })
            .await;
            sink.emit(TraceEntry::Final {
                notes: Some("synthesis oracle call failed; returning literal fallback".to_string()),
            })
            .await;
            return Ok(RunOutcome {
                answer: "I don't know based on the provided documents.".to_string(),
                citations: Vec::new(),
                insufficiencies: state.insufficiencies.clone(),
            });
        }
    };

    let grounding = ground_citations(&reply, &[], state);
    sink.emit(TraceEntry::Final {
        notes: Some("synthesized from partial context after loop exit".to_string()),
    })
    .await;
    Ok(RunOutcome {
        answer: grounding.cleaned_answer,
        citations: grounding.citations,
        insufficiencies: state.insufficiencies.clone(),
    })
}

fn build_synthesis_prompt(question: &str, state: &AgentState) -> String {
    let mut out = String::new();
    out.push_str(
        "You must now produce a complete, source-bound answer using ONLY the text below. \
         Cite every claim by its bracket number, e.g. [1]. If something required cannot be \
         supported by this text, say so plainly rather than inventing it.\n\n",
    );
    out.push_str(&format!("QUESTION: {question}\n\n"));

    if !state.citation_history.is_empty() {
        out.push_str("OPENED CITATIONS:\n");
        for chunk in &state.citation_history {
            out.push_str(&format!(
                "[{}] {} (chunk {}):\n{}\n\n",
                chunk.citation_num, chunk.filename, chunk.chunk_index, chunk.text
            ));
        }
    } else {
        out.push_str("TOP SEARCH SNIPPETS (nothing was fully opened this run):\n");
        let mut hits: Vec<&SearchHit> = state.search_results.iter().collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        for hit in hits.into_iter().take(3) {
            out.push_str(&format!("- {} ({}): {}\n", hit.filename, hit.doc_id, hit.snippet));
        }
        out.push('\n');
    }

    out.push_str("Respond with the answer text only.");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_tools::{FakeOracleClient, FakeToolClient};

    #[tokio::test]
    async fn empty_question_is_rejected() {
        let oracle = FakeOracleClient::new(vec![]);
        let tool = FakeToolClient::empty();
        let config = RunConfig::default();
        let mut sink = crate::sink::CollectSink::new();
        let result = run("   ", "u1", &oracle, &tool, &config, &mut sink).await;
        assert!(matches!(result, Err(ExecutorError::Core(CoreError::EmptyQuestion))));
    }

    #[tokio::test]
    async fn no_context_at_all_returns_literal_dont_know() {
        let oracle = FakeOracleClient::new(vec![
            r#"["search", "synthesize"]"#,
            r#"{"type":"final","answer":"I truly don't know."}"#,
        ]);
        let tool = FakeToolClient::empty();
        let config = RunConfig::default();
        let mut sink = crate::sink::CollectSink::new();
        let outcome = run("What is the deal?", "u1", &oracle, &tool, &config, &mut sink)
            .await
            .unwrap();
        assert_eq!(outcome.answer, "I don't know based on the provided documents.");
        assert!(outcome.citations.is_empty());
    }

    #[tokio::test]
    async fn happy_path_accepts_valid_citation() {
        let hit = SearchHit {
            doc_id: "doc-123".into(),
            chunk_id: "chunk-456".into(),
            chunk_index: 0,
            snippet: "s".into(),
            score: 0.9,
            filename: "f.txt".into(),
            query: "q".into(),
        };
        let chunk = agent_core::ports::OpenedChunkText {
            doc_id: "doc-123".into(),
            chunk_id: "chunk-456".into(),
            chunk_index: 0,
            text: "the actual retrieved answer text".into(),
            filename: "f.txt".into(),
        };
        let tool = FakeToolClient::new(vec![hit], vec![chunk]);
        let oracle = FakeOracleClient::new(vec![
            r#"["search", "open", "synthesize"]"#,
            r#"{"type":"tool_call","tool":"search_docs","input":{"query":"q"}}"#,
            r#"{"type":"tool_call","tool":"open_citation","input":{"docId":"doc-123","chunkId":"chunk-456"}}"#,
            r#"{"type":"final","answer":"Based on [1] here is the answer.","used_citations":[{"doc_id":"doc-123","chunk_id":"chunk-456","chunk_index":0}]}"#,
        ]);
        let config = RunConfig::default();
        let mut sink = crate::sink::CollectSink::new();
        let outcome = run("What is X?", "u1", &oracle, &tool, &config, &mut sink)
            .await
            .unwrap();
        assert_eq!(outcome.citations.len(), 1);
        assert!(outcome.answer.contains("[1]"));
        assert!(sink.entries.iter().any(|e| matches!(e, TraceEntry::Final { .. })));
    }

    #[tokio::test]
    async fn early_final_is_rejected_until_constraints_met() {
        let constraints_question = "Using only my documents, produce the authoritative runbook. \
            Requires separate searches for 'reindex sql', 'delete verification', 'redirect uri'; \
            open_citation for at least two citations; quote one exact SQL statement and one exact \
            Redirect URI.";
        let oracle = FakeOracleClient::new(vec![
            r#"["search", "open", "synthesize"]"#,
            r#"{"type":"tool_call","tool":"search_docs","input":{"query":"reindex sql"}}"#,
            r#"{"type":"final","answer":"Use pg_reindex.","used_citations":[]}"#,
        ]);
        let tool = FakeToolClient::empty();
        let config = RunConfig::default();
        let mut sink = crate::sink::CollectSink::new();
        let _outcome = run(constraints_question, "u1", &oracle, &tool, &config, &mut sink)
            .await
            .unwrap();
        assert!(sink
            .entries
            .iter()
            .any(|e| matches!(e, TraceEntry::Validation { .. })));
        assert!(sink
            .entries
            .iter()
            .any(|e| matches!(e, TraceEntry::Reprompt { .. })));
    }

    #[tokio::test]
    async fn budget_exhaustion_falls_back_to_synthesis() {
        let hit = SearchHit {
            doc_id: "doc-1".into(),
            chunk_id: "chunk-1".into(),
            chunk_index: 0,
            snippet: "relevant snippet".into(),
            score: 0.8,
            filename: "f.txt".into(),
            query: "q".into(),
        };
        let oracle = FakeOracleClient::new(vec![
            r#"["search"]"#,
            r#"{"type":"tool_call","tool":"search_docs","input":{"query":"q"}}"#,
        ]);
        let tool = FakeToolClient::new(vec![hit], vec![]);
        let config = RunConfig {
            max_tool_calls: 1,
            ..RunConfig::default()
        };
        let mut sink = crate::sink::CollectSink::new();
        let outcome = run("Tell me about q.", "u1", &oracle, &tool, &config, &mut sink)
            .await
            .unwrap();
        assert!(!outcome.answer.is_empty());
    }
}
