//! Error types.
//!
//! Each layer has its own error enum. Transport failures are wrapped
//! by tool failures, which are in turn wrapped by generation failures,
//! so the message that finally reaches the user still names the cause.

use std::path::PathBuf;
use thiserror::Error;

/// Startup configuration problems. Fatal: no task is served.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{name} environment variable is required")]
    MissingCredential { name: &'static str },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// A failure on a single remote call.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Pagination exceeded {max_pages} full pages")]
    PageLimit { max_pages: usize },
}

/// Errors raised while looking up, validating or running a tool.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    NotFound(String),

    #[error("Tool already registered: {0}")]
    Duplicate(String),

    #[error("Invalid input for {tool}: {message}")]
    InvalidInput { tool: String, message: String },

    #[error("{tool} failed: {source}")]
    Execution {
        tool: String,
        #[source]
        source: TransportError,
    },
}

impl ToolError {
    pub fn invalid_input(tool: &str, message: impl Into<String>) -> Self {
        ToolError::InvalidInput {
            tool: tool.to_string(),
            message: message.into(),
        }
    }

    pub fn execution(tool: &str, source: TransportError) -> Self {
        ToolError::Execution {
            tool: tool.to_string(),
            source,
        }
    }

    /// Errors the model can recover from by issuing a different call.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ToolError::NotFound(_) | ToolError::InvalidInput { .. })
    }
}

/// Any failure while asking the language model for an answer.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Model request failed: {0}")]
    Transport(#[from] TransportError),

    #[error("{0}")]
    Model(String),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("Model did not produce an answer within {0} tool-calling rounds")]
    IterationLimit(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_error_message_names_cause() {
        let err = ToolError::execution(
            "get_slot",
            TransportError::Status {
                status: 503,
                body: "unavailable".to_string(),
            },
        );
        let generation: GenerationError = err.into();
        assert_eq!(
            generation.to_string(),
            "get_slot failed: API error 503: unavailable"
        );
    }

    #[test]
    fn test_recoverable_tool_errors() {
        assert!(ToolError::NotFound("x".to_string()).is_recoverable());
        assert!(ToolError::invalid_input("x", "missing field").is_recoverable());
        assert!(!ToolError::execution("x", TransportError::Decode("bad".to_string()))
            .is_recoverable());
    }

    #[test]
    fn test_missing_credential_message() {
        let err = ConfigError::MissingCredential {
            name: "DUNE_API_KEY",
        };
        assert_eq!(err.to_string(), "DUNE_API_KEY environment variable is required");
    }
}
