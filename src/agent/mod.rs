//! Agent runtime: tools, the language model loop, and the task handler.

pub mod dune_tools;
pub mod handler;
pub mod model;
pub mod solana_tools;
pub mod tools;

pub use handler::{normalize_history, TaskHandler};
pub use model::{LanguageModel, OllamaModel};
pub use tools::{FnTool, Tool, ToolRegistry};
