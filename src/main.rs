//! Chainscope - ask blockchain questions from the command line
//!
//! Runs a single task against the Dune or Solana agent and prints the
//! terminal task update as JSON on stdout. Logs go to stderr.
//!
//! Exit codes:
//!   0 - Task completed
//!   1 - Runtime error (bad arguments, missing credentials, config file)
//!   2 - Task ended in the failed state

use anyhow::{Context, Result};
use chainscope::agent::OllamaModel;
use chainscope::cli::Args;
use chainscope::config::{Config, DEFAULT_CONFIG_FILE};
use chainscope::models::{ConversationTurn, TaskContext, TaskState};
use chainscope::service::{agent_card, build_agent, run_single_task};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args)?;

    info!("Chainscope v{}", env!("CARGO_PKG_VERSION"));
    debug!("Agent: {}", args.agent);

    match run(args).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: write a default config file.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "{} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    std::fs::write(path, Config::default_toml())
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("Credentials are read from DUNE_API_KEY, SOLANA_RPC_URL and MODEL_API_KEY.");
    Ok(())
}

/// Logs go to stderr so stdout carries only the JSON result.
/// `RUST_LOG` overrides the level picked from --verbose/--quiet.
fn init_logging(args: &Args) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level().to_string().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Run one task. Returns the exit code.
async fn run(args: Args) -> Result<i32> {
    if args.card {
        let card = serde_json::to_string_pretty(&agent_card(args.agent))?;
        println!("{}", card);
        return Ok(0);
    }

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    debug!("Model: {} at {}", config.model.name, config.model.ollama_url);
    let model = OllamaModel::new(&config.model)?;
    let handler = build_agent(args.agent, &config, Arc::new(model))?;

    let question = args.ask.clone().unwrap_or_default();
    let context = TaskContext::new(vec![ConversationTurn::user(question)]);
    let deadline = config.general.task_timeout_seconds.map(Duration::from_secs);

    let update = run_single_task(&handler, context, deadline).await;
    println!("{}", serde_json::to_string_pretty(&update)?);

    Ok(match update.state {
        TaskState::Completed => 0,
        TaskState::Failed => 2,
    })
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Ok(Config::load(config_path)?);
    }

    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
