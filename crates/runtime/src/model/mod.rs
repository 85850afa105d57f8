//! Conversation data model and model transport trait.

pub mod errors;
pub mod types;

pub use errors::ModelError;
pub use types::{
    Backend, ContentBlock, ImageSource, ModelRequest, ModelResponse, Role, StopReason,
    ToolContentItem, ToolResult, ToolResultContent, ToolSpec, ToolUse, Turn, Usage,
};
