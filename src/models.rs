//! Data models shared by the agents.
//!
//! This module contains the conversation types received from the task
//! service, the normalized messages sent to the language model, the
//! terminal task update, and the per-source result of a fan-out query.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Who authored a conversation turn.
///
/// Only `agent` marks an agent turn; any other role string reads as `user`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Role {
    User,
    Agent,
}

impl From<String> for Role {
    fn from(role: String) -> Self {
        if role == "agent" {
            Role::Agent
        } else {
            Role::User
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Agent => write!(f, "agent"),
        }
    }
}

/// One content part of a turn. Only text parts reach the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(rename = "type", default = "default_part_type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

fn default_part_type() -> String {
    "text".to_string()
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: "text".to_string(),
            text: Some(text.into()),
            data: None,
        }
    }

    pub fn data(data: Value) -> Self {
        Self {
            kind: "data".to_string(),
            text: None,
            data: Some(data),
        }
    }

    /// The part's text, if it carries any. Empty strings count as no text.
    pub fn text_content(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }
}

/// A single message in the incoming conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::text(text)],
        }
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self {
            role: Role::Agent,
            parts: vec![Part::text(text)],
        }
    }
}

/// Context the task service passes to a handler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskContext {
    #[serde(default)]
    pub history: Vec<ConversationTurn>,
}

impl TaskContext {
    pub fn new(history: Vec<ConversationTurn>) -> Self {
        Self { history }
    }
}

/// Role as the language model sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelRole {
    User,
    Model,
}

impl From<Role> for ModelRole {
    fn from(role: Role) -> Self {
        match role {
            Role::Agent => ModelRole::Model,
            Role::User => ModelRole::User,
        }
    }
}

/// A normalized message: role plus the turn's text segments in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMessage {
    pub role: ModelRole,
    pub content: Vec<String>,
}

impl ModelMessage {
    /// Segments joined into one string for chat APIs that take plain text.
    pub fn joined_text(&self) -> String {
        self.content.join("\n")
    }
}

/// Terminal state of a task. Only the two end states are ever emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Completed,
    Failed,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Completed => write!(f, "completed"),
            TaskState::Failed => write!(f, "failed"),
        }
    }
}

/// Message attached to a task update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMessage {
    pub role: Role,
    pub parts: Vec<Part>,
}

/// The single update a handler produces per invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskYieldUpdate {
    pub state: TaskState,
    pub message: AgentMessage,
}

impl TaskYieldUpdate {
    fn new(state: TaskState, text: impl Into<String>) -> Self {
        Self {
            state,
            message: AgentMessage {
                role: Role::Agent,
                parts: vec![Part::text(text)],
            },
        }
    }

    pub fn completed(text: impl Into<String>) -> Self {
        Self::new(TaskState::Completed, text)
    }

    pub fn failed(text: impl Into<String>) -> Self {
        Self::new(TaskState::Failed, text)
    }

    /// Concatenated text of the message parts.
    pub fn text(&self) -> String {
        self.message
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Outcome of one named query inside a fan-out.
///
/// A failed fetch still yields empty `rows`; `error` is what tells it
/// apart from a source that genuinely returned nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub label: String,
    #[serde(rename = "queryId")]
    pub query_id: u64,
    pub rows: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryResult {
    pub fn ok(label: impl Into<String>, query_id: u64, rows: Vec<Value>) -> Self {
        Self {
            label: label.into(),
            query_id,
            rows,
            error: None,
        }
    }

    pub fn failed(label: impl Into<String>, query_id: u64, error: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            query_id,
            rows: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}
