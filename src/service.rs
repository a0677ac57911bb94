//! Agent assembly and the single-task runner used by the binary.
//!
//! The network task service is out of process; what lives here is the
//! static capability card each agent advertises, the wiring from
//! configuration to a ready [`TaskHandler`], and a runner that applies
//! an optional deadline to one task.

use crate::agent::dune_tools::register_dune_tools;
use crate::agent::handler::{generation_failure, TaskHandler};
use crate::agent::model::LanguageModel;
use crate::agent::solana_tools::register_solana_tools;
use crate::agent::tools::ToolRegistry;
use crate::analytics::client::DuneClient;
use crate::analytics::dune::DuneService;
use crate::analytics::pagination::PageLimits;
use crate::cli::AgentKind;
use crate::config::Config;
use crate::error::ConfigError;
use crate::models::{TaskContext, TaskYieldUpdate};
use crate::solana::SolanaClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const DUNE_PROMPT: &str = r#"You are a blockchain data analyst with access to Dune Analytics.

Use the tools to answer questions about DEX token pairs and liquidity,
Solana wallet token balances, EigenLayer AVS and operator statistics,
and token launchpads (LaunchLab, LetsBonk, Pumpfun, Boop).

Always call a tool before quoting a number. If a launchpad entry carries
an error, say that its data is unavailable rather than reporting zero.
Answer concisely and format large numbers with thousands separators."#;

const SOLANA_PROMPT: &str = r#"You are a Solana blockchain assistant connected to a Solana RPC node.

Use get_slot for questions about the current slot or block height and
get_balance for the SOL balance of a wallet. Balances are returned in SOL.
If a wallet address looks malformed, ask the user to check it.
Answer concisely."#;

/// What an agent advertises about itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    pub name: String,
    pub description: String,
    pub url: String,
    pub provider: AgentProvider,
    pub version: String,
    pub capabilities: AgentCapabilities,
    pub authentication: Option<serde_json::Value>,
    pub default_input_modes: Vec<String>,
    pub default_output_modes: Vec<String>,
    pub skills: Vec<AgentSkill>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProvider {
    pub organization: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    pub streaming: bool,
    pub push_notifications: bool,
    pub state_transition_history: bool,
}

impl Default for AgentCapabilities {
    fn default() -> Self {
        Self {
            streaming: false,
            push_notifications: false,
            state_transition_history: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSkill {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub examples: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn dune_agent_card() -> AgentCard {
    AgentCard {
        name: "Dune Agent".to_string(),
        description: "Query blockchain data using Dune Analytics APIs.".to_string(),
        url: "http://0.0.0.0:10000".to_string(),
        provider: AgentProvider {
            organization: "Dune Agents".to_string(),
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        capabilities: AgentCapabilities::default(),
        authentication: None,
        default_input_modes: strings(&["text"]),
        default_output_modes: strings(&["text"]),
        skills: vec![AgentSkill {
            id: "dune_query".to_string(),
            name: "Dune Blockchain Query".to_string(),
            description: "Query DEX liquidity, token balances, EigenLayer and launchpad stats via Dune API."
                .to_string(),
            tags: strings(&["dune", "dex", "solana", "svm", "token", "eigenlayer", "launchpad"]),
            examples: strings(&[
                "Show me the top Solana token pairs by liquidity.",
                "What tokens does 3aH1...XYZ hold?",
                "Get operator stats for AVS 'EigenDA'",
                "How many tokens graduated from Pumpfun?",
            ]),
        }],
    }
}

pub fn solana_agent_card() -> AgentCard {
    AgentCard {
        name: "Solana Agent".to_string(),
        description: "Query Solana blockchain data via JSON-RPC.".to_string(),
        url: "http://localhost:41241".to_string(),
        provider: AgentProvider {
            organization: "QuickNode Agents".to_string(),
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        capabilities: AgentCapabilities::default(),
        authentication: None,
        default_input_modes: strings(&["text"]),
        default_output_modes: strings(&["text"]),
        skills: vec![AgentSkill {
            id: "solana_query".to_string(),
            name: "Solana Blockchain Query".to_string(),
            description: "Query data like slot number or wallet balance.".to_string(),
            tags: strings(&["solana", "blockchain", "rpc", "balance"]),
            examples: strings(&[
                "What's the current Solana slot?",
                "Check wallet balance for 3aH1...XYZ",
            ]),
        }],
    }
}

pub fn agent_card(kind: AgentKind) -> AgentCard {
    match kind {
        AgentKind::Dune => dune_agent_card(),
        AgentKind::Solana => solana_agent_card(),
    }
}

/// Build the handler for `kind`.
///
/// Fails if a credential the agent needs is missing, so a misconfigured
/// process never gets as far as serving a task.
pub fn build_agent(
    kind: AgentKind,
    config: &Config,
    model: Arc<dyn LanguageModel>,
) -> Result<TaskHandler, ConfigError> {
    config.require_credentials(kind)?;

    let mut tools = ToolRegistry::new();
    let prompt = match kind {
        AgentKind::Dune => {
            let client = DuneClient::new(&config.dune)?;
            let limits = PageLimits {
                page_size: config.dune.page_size,
                max_pages: config.dune.max_pages,
            };
            let service = DuneService::new(Arc::new(client), limits, config.dune.launchpad_limit);
            register_dune_tools(&mut tools, &service)
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
            DUNE_PROMPT
        }
        AgentKind::Solana => {
            let client = SolanaClient::new(&config.solana)?;
            register_solana_tools(&mut tools, &client)
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
            SOLANA_PROMPT
        }
    };

    let card = agent_card(kind);
    info!("{} ready with tools: {}", card.name, tools.names().join(", "));

    Ok(TaskHandler::new(card.name, prompt, model, tools))
}

/// Run one task to its terminal update, failing it if `deadline` passes.
pub async fn run_single_task(
    handler: &TaskHandler,
    context: TaskContext,
    deadline: Option<Duration>,
) -> TaskYieldUpdate {
    let Some(limit) = deadline else {
        return handler.handle(&context).await;
    };

    match tokio::time::timeout(limit, handler.handle(&context)).await {
        Ok(update) => update,
        Err(_) => {
            warn!("{}: task exceeded {}s deadline", handler.name(), limit.as_secs());
            TaskYieldUpdate::failed(generation_failure(format!(
                "Task timed out after {}s",
                limit.as_secs()
            )))
        }
    }
}
