//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::fmt;
use std::path::PathBuf;

/// Chainscope - ask questions about on-chain data
///
/// Runs one task against a Dune Analytics or Solana agent and prints the
/// terminal task update as JSON.
///
/// Examples:
///   chainscope --agent dune --ask "Show me the top Solana token pairs by liquidity."
///   chainscope --agent solana --ask "What's the current Solana slot?"
///   chainscope --agent dune --card
///   chainscope --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Which agent answers the question
    #[arg(short, long, value_enum, default_value = "dune")]
    pub agent: AgentKind,

    /// Question to send as a single user turn
    #[arg(
        long,
        value_name = "QUESTION",
        required_unless_present_any = ["card", "init_config"]
    )]
    pub ask: Option<String>,

    /// Print the agent's capability card and exit
    #[arg(long)]
    pub card: bool,

    /// Model to use for generation [default: qwen2.5-coder:32b]
    ///
    /// The model must support tool calling. Overrides `model.name` in the
    /// config file.
    #[arg(short, long, env = "CHAINSCOPE_MODEL")]
    pub model: Option<String>,

    /// Ollama-compatible chat API endpoint URL [default: http://localhost:11434]
    #[arg(long, env = "OLLAMA_URL")]
    pub ollama_url: Option<String>,

    /// API key sent as a bearer token to the model server
    #[arg(long, env = "MODEL_API_KEY", hide_env_values = true)]
    pub model_api_key: Option<String>,

    /// Dune Analytics API key
    #[arg(long, env = "DUNE_API_KEY", hide_env_values = true)]
    pub dune_api_key: Option<String>,

    /// Solana JSON-RPC endpoint
    #[arg(long, env = "SOLANA_RPC_URL")]
    pub solana_rpc_url: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .chainscope.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Temperature for LLM responses (0.0 - 2.0) [default: 0.1]
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Deadline for the whole task in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Maximum tool-calling rounds before giving up
    #[arg(long, value_name = "ROUNDS")]
    pub max_iterations: Option<usize>,

    /// Generate a default .chainscope.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// The agents this binary can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum AgentKind {
    /// Dune Analytics: DEX, balances, EigenLayer, launchpads
    Dune,
    /// Solana RPC: slot and SOL balance
    Solana,
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentKind::Dune => write!(f, "dune"),
            AgentKind::Solana => write!(f, "solana"),
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if !self.card {
            if let Some(ref url) = self.ollama_url {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err("Ollama URL must start with 'http://' or 'https://'".to_string());
                }
            }

            if self.ask.as_deref().map(str::trim).unwrap_or("").is_empty() {
                return Err("Question must not be empty".to_string());
            }
        }

        if self.temperature.is_some_and(|t| !(0.0..=2.0).contains(&t)) {
            return Err("Temperature must be between 0.0 and 2.0".to_string());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if self.max_iterations == Some(0) {
            return Err("Max iterations must be at least 1".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
