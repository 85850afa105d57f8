//! Skiff runtime: conversations with a model that can call tools.
//!
//! This crate holds the tool-invocation loop and everything it touches:
//! the turn data model, the tool capability trait and registry, the model
//! transport trait with an Anthropic implementation, and transcript
//! persistence.
//!
//! # Overview
//!
//! - **Tool**: a named, schema-bearing capability the model may invoke.
//! - **ToolRegistry**: name → tool lookup, fixed for a conversation.
//! - **Turn / ContentBlock**: append-only conversation history.
//! - **Backend**: the model transport (see [`AnthropicBackend`]).
//! - **Conversation**: owns the history, calls the model, dispatches tool
//!   requests and feeds results back until the model answers in plain text.
//!
//! # Example
//!
//! ```ignore
//! use runtime::{AnthropicAuth, AnthropicBackend, Conversation, ConversationConfig, ToolRegistry};
//!
//! # async fn example() -> runtime::Result<()> {
//! let backend = AnthropicBackend::builder(AnthropicAuth::ApiKey("sk-ant-api03-...".into())).build();
//! let config = ConversationConfig::new("claude-3-5-haiku-latest").system("Be concise.");
//!
//! let mut conversation = Conversation::new(backend, ToolRegistry::new(), config);
//! let answer = conversation.submit_prompt("Hello!").await?;
//! println!("{}", answer.text());
//! # Ok(())
//! # }
//! ```

mod config;
mod conversation;
mod error;
pub mod model;
mod providers;
pub mod tools;
pub mod transcript;

#[cfg(test)]
mod testing;

pub use config::{
    ConversationConfig, DEFAULT_MAX_TOKENS, DEFAULT_MAX_TOOL_ROUNDS, DEFAULT_MODEL_TIMEOUT,
    RetryPolicy,
};
pub use conversation::{Conversation, EngineState};
pub use error::{Error, Result};
pub use model::{
    Backend, ContentBlock, ModelError, ModelRequest, ModelResponse, Role, ToolResult,
    ToolResultContent, ToolSpec, ToolUse, Turn, Usage,
};
pub use providers::{AnthropicAuth, AnthropicBackend, AnthropicBackendBuilder};
pub use tools::{Tool, ToolError, ToolRegistry};
