//! agentd — bounded agent runtime entry point.
//!
//! Wires `agent-core`'s `RunConfig`, the HTTP-backed `OracleClient`/
//! `ToolClient` implementations from `agent-tools`, and the `agent-api`
//! server together, the way the teacher's root `main.rs` wires
//! `CodeEngine`/`LTMManager`/`AgentCoordinator`/`ToolManager` into an
//! `ApiServer`. Also offers a one-shot local mode that runs a single
//! question through `agent-executor` against stdin, for debugging
//! without standing up the HTTP server.

use std::io::Read as _;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use agent_core::{OracleClient, RunConfig, ToolClient};
use agent_executor::{run, CollectSink};
use agent_tools::{HttpOracleClient, HttpToolClient};

/// Command line interface for agentd.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable verbose (debug) logging.
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file path, merged under env var overrides.
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Run a single question from stdin instead of starting the server.
    #[arg(long)]
    once: bool,

    /// Port to bind the HTTP server to (overridden by AGENT_PORT).
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Base URL of the oracle (chat completion) backend.
    #[arg(long, env = "AGENT_ORACLE_URL", default_value = "http://localhost:11434/v1")]
    oracle_url: String,

    /// Oracle model name.
    #[arg(long, env = "AGENT_ORACLE_MODEL", default_value = "local-model")]
    oracle_model: String,

    /// Oracle API key, if the backend requires one.
    #[arg(long, env = "AGENT_ORACLE_API_KEY")]
    oracle_api_key: Option<String>,

    /// Base URL of the document tool backend (search_docs/open_citation).
    #[arg(long, env = "AGENT_TOOL_URL", default_value = "http://localhost:8081")]
    tool_url: String,
}

/// Loads `RunConfig` from `config.toml` (if present) with `AGENT_*`
/// environment variable overrides, falling back to `RunConfig::default()`
/// fields the file/env don't set. Mirrors the teacher's configuration
/// layering described for `SafetyConfig`.
fn load_run_config(config_path: &str) -> Result<RunConfig> {
    let defaults = RunConfig::default();
    let builder = config::Config::builder()
        .set_default("max_tool_calls", defaults.max_tool_calls as i64)?
        .set_default("max_iterations", defaults.max_iterations as i64)?
        .set_default("max_reprompts", defaults.max_reprompts as i64)?
        .set_default("max_context_citations", defaults.max_context_citations as i64)?
        .set_default(
            "max_citation_text_for_llm",
            defaults.max_citation_text_for_llm as i64,
        )?
        .set_default("max_question_length", defaults.max_question_length as i64)?
        .set_default("max_tokens_default", defaults.max_tokens_default as i64)?
        .set_default("max_tokens_complex", defaults.max_tokens_complex as i64)?
        .set_default("max_search_results", defaults.max_search_results as i64)?
        .add_source(config::File::from(std::path::Path::new(config_path)).required(false))
        .add_source(config::Environment::with_prefix("AGENT").separator("_"));

    let run_config: RunConfig = builder.build()?.try_deserialize().context("loading RunConfig")?;
    run_config.validate().map_err(|e| anyhow::anyhow!(e))?;
    Ok(run_config)
}

fn build_clients(args: &Args, config: &RunConfig) -> (Arc<dyn OracleClient>, Arc<dyn ToolClient>) {
    let oracle = HttpOracleClient::new(
        args.oracle_url.clone(),
        args.oracle_model.clone(),
        args.oracle_api_key.clone().unwrap_or_default(),
    );
    let tool = HttpToolClient::new(args.tool_url.clone(), config.max_search_results);
    (Arc::new(oracle), Arc::new(tool))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    if args.verbose {
        std::env::set_var("RUST_LOG", "debug");
    }

    info!("starting agentd with args: {:?}", args);

    let run_config = load_run_config(&args.config)?;
    let (oracle, tool) = build_clients(&args, &run_config);

    if args.once {
        run_once_mode(oracle, tool, run_config).await
    } else {
        run_server_mode(args.port, oracle, tool, run_config).await
    }
}

/// Reads one question from stdin, runs it to completion, and prints the
/// answer plus citations to stdout. Useful for exercising the bounded
/// loop against a real oracle/tool backend without the HTTP layer.
async fn run_once_mode(
    oracle: Arc<dyn OracleClient>,
    tool: Arc<dyn ToolClient>,
    config: RunConfig,
) -> Result<()> {
    let mut question = String::new();
    std::io::stdin()
        .read_to_string(&mut question)
        .context("reading question from stdin")?;

    let mut sink = CollectSink::new();
    let outcome = run(&question, "local", oracle.as_ref(), tool.as_ref(), &config, &mut sink)
        .await
        .context("running agent")?;

    println!("{}", outcome.answer);
    for citation in &outcome.citations {
        println!(
            "  [{}] {} ({}#{})",
            citation.chunk_id, citation.filename, citation.doc_id, citation.chunk_index
        );
    }
    for insufficiency in &outcome.insufficiencies {
        println!("  insufficient: {} — {}", insufficiency.section, insufficiency.missing);
    }

    Ok(())
}

async fn run_server_mode(
    port: u16,
    oracle: Arc<dyn OracleClient>,
    tool: Arc<dyn ToolClient>,
    config: RunConfig,
) -> Result<()> {
    let api_config = agent_api::ApiConfig {
        port,
        ..agent_api::ApiConfig::default()
    };

    let server = agent_api::ApiServer::new(api_config, oracle, tool, config);
    server.start().await
}
