//! Configuration file handling.
//!
//! This module handles loading `.chainscope.toml`, merging it with CLI
//! arguments, and the startup credential check.

use crate::cli::{AgentKind, Args};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = ".chainscope.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Dune Analytics settings.
    #[serde(default)]
    pub dune: DuneConfig,

    /// Solana RPC settings.
    #[serde(default)]
    pub solana: SolanaConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Deadline for one task, in seconds. No deadline when unset.
    #[serde(default)]
    pub task_timeout_seconds: Option<u64>,
}

/// LLM model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model name.
    #[serde(default = "default_model")]
    pub name: String,

    /// Ollama-compatible API URL.
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds for one chat call.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Maximum tool-calling rounds per task.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Bearer token for hosted model gateways.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            ollama_url: default_ollama_url(),
            temperature: default_temperature(),
            timeout_seconds: default_timeout(),
            max_iterations: default_max_iterations(),
            api_key: None,
        }
    }
}

fn default_model() -> String {
    "qwen2.5-coder:32b".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_timeout() -> u64 {
    300
}

fn default_max_iterations() -> usize {
    8
}

/// Dune Analytics API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuneConfig {
    /// API base URL.
    #[serde(default = "default_dune_base_url")]
    pub base_url: String,

    /// Rows requested per page on paginated endpoints.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Upper bound on pages fetched by one paginated collection.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Default `limit` for launchpad query results.
    #[serde(default = "default_launchpad_limit")]
    pub launchpad_limit: u32,

    /// HTTP timeout per request in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Sent as `X-Dune-API-Key`. Taken from the environment, never written out.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for DuneConfig {
    fn default() -> Self {
        Self {
            base_url: default_dune_base_url(),
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            launchpad_limit: default_launchpad_limit(),
            request_timeout_seconds: default_request_timeout(),
            api_key: None,
        }
    }
}

fn default_dune_base_url() -> String {
    "https://api.dune.com/api".to_string()
}

fn default_page_size() -> usize {
    100
}

fn default_max_pages() -> usize {
    500
}

fn default_launchpad_limit() -> u32 {
    1
}

fn default_request_timeout() -> u64 {
    60
}

/// Solana RPC settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolanaConfig {
    /// JSON-RPC endpoint.
    #[serde(default)]
    pub rpc_url: Option<String>,

    /// HTTP timeout per request in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for SolanaConfig {
    fn default() -> Self {
        Self {
            rpc_url: None,
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>, ConfigError> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    pub fn merge_with_args(&mut self, args: &Args) {
        // Model settings - only override if given on the command line
        if let Some(ref name) = args.model {
            self.model.name = name.clone();
        }
        if let Some(ref url) = args.ollama_url {
            self.model.ollama_url = url.clone();
        }
        if let Some(temperature) = args.temperature {
            self.model.temperature = temperature;
        }
        if let Some(max_iterations) = args.max_iterations {
            self.model.max_iterations = max_iterations;
        }
        if let Some(timeout) = args.timeout {
            self.general.task_timeout_seconds = Some(timeout);
        }

        // Credentials - only override if provided
        if args.model_api_key.is_some() {
            self.model.api_key = args.model_api_key.clone();
        }
        if args.dune_api_key.is_some() {
            self.dune.api_key = args.dune_api_key.clone();
        }
        if args.solana_rpc_url.is_some() {
            self.solana.rpc_url = args.solana_rpc_url.clone();
        }
    }

    /// Check that everything the given agent needs is present.
    ///
    /// Runs once at startup; a missing credential means the process must
    /// not serve any task.
    pub fn require_credentials(&self, agent: AgentKind) -> Result<(), ConfigError> {
        match agent {
            AgentKind::Dune => {
                if self.dune.api_key.as_deref().map_or(true, str::is_empty) {
                    return Err(ConfigError::MissingCredential {
                        name: "DUNE_API_KEY",
                    });
                }
                if self.dune.page_size == 0 {
                    return Err(ConfigError::Invalid(
                        "dune.page_size must be at least 1".to_string(),
                    ));
                }
                if self.dune.max_pages == 0 {
                    return Err(ConfigError::Invalid(
                        "dune.max_pages must be at least 1".to_string(),
                    ));
                }
            }
            AgentKind::Solana => {
                if self.solana.rpc_url.as_deref().map_or(true, str::is_empty) {
                    return Err(ConfigError::MissingCredential {
                        name: "SOLANA_RPC_URL",
                    });
                }
            }
        }
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}
