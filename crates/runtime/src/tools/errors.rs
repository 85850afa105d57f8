use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while resolving or executing a tool.
///
/// None of these abort a conversation: the engine turns each one into an
/// `is_error` tool result and hands it back to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum ToolError {
    #[error("tool not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("timeout after {0}ms")]
    Timeout(u64),
    #[error("execution failed: {0}")]
    Execution(String),
    #[error("tool panicked: {0}")]
    Panicked(String),
}
