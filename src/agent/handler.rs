//! Task handler: turns a conversation into exactly one terminal update.

use crate::agent::model::LanguageModel;
use crate::agent::tools::ToolRegistry;
use crate::models::{ConversationTurn, ModelMessage, TaskContext, TaskYieldUpdate};
use chrono::{SecondsFormat, Utc};
use futures::stream::{self, Stream};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const NO_HISTORY: &str = "No messages to process.";
pub const NO_TEXT_CONTENT: &str = "No message found to process.";

/// The user-facing sentence for any failure during generation.
pub fn generation_failure(detail: impl std::fmt::Display) -> String {
    format!("An error occurred while processing the request: {}", detail)
}

/// Map conversation turns to model messages.
///
/// `agent` turns become `model` turns. Only non-empty text parts are kept,
/// in order, and a turn left with no text is dropped.
pub fn normalize_history(history: &[ConversationTurn]) -> Vec<ModelMessage> {
    history
        .iter()
        .filter_map(|turn| {
            let content: Vec<String> = turn
                .parts
                .iter()
                .filter_map(|part| part.text_content())
                .map(str::to_string)
                .collect();

            (!content.is_empty()).then(|| ModelMessage {
                role: turn.role.into(),
                content,
            })
        })
        .collect()
}

/// One agent: a system prompt, a model, and the tools the model may call.
#[derive(Clone)]
pub struct TaskHandler {
    name: String,
    prompt: String,
    model: Arc<dyn LanguageModel>,
    tools: ToolRegistry,
}

impl fmt::Debug for TaskHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandler")
            .field("name", &self.name)
            .field("tools", &self.tools.names())
            .finish_non_exhaustive()
    }
}

impl TaskHandler {
    pub fn new(
        name: impl Into<String>,
        prompt: impl Into<String>,
        model: Arc<dyn LanguageModel>,
        tools: ToolRegistry,
    ) -> Self {
        Self {
            name: name.into(),
            prompt: prompt.into(),
            model,
            tools,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// System prompt with the current time appended.
    fn preamble(&self) -> String {
        format!(
            "{}\n\nThe current date and time is {}.",
            self.prompt,
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
        )
    }

    /// Handle one task. Never fails: every outcome is a terminal update.
    pub async fn handle(&self, context: &TaskContext) -> TaskYieldUpdate {
        if context.history.is_empty() {
            warn!("{}: task has no history", self.name);
            return TaskYieldUpdate::failed(NO_HISTORY);
        }

        let messages = normalize_history(&context.history);
        if messages.is_empty() {
            warn!("{}: task history has no text", self.name);
            return TaskYieldUpdate::failed(NO_TEXT_CONTENT);
        }

        debug!(
            "{}: generating from {} messages with {} tools",
            self.name,
            messages.len(),
            self.tools.len()
        );

        match self
            .model
            .generate(&self.preamble(), &messages, &self.tools)
            .await
        {
            Ok(text) => {
                info!("{}: task completed", self.name);
                TaskYieldUpdate::completed(text.trim())
            }
            Err(e) => {
                warn!("{}: generation failed: {}", self.name, e);
                TaskYieldUpdate::failed(generation_failure(e))
            }
        }
    }

    /// The same outcome as [`handle`](Self::handle), as a one-item stream.
    pub fn updates<'a>(
        &'a self,
        context: &'a TaskContext,
    ) -> impl Stream<Item = TaskYieldUpdate> + 'a {
        stream::once(self.handle(context))
    }
}
