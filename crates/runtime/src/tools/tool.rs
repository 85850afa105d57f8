//! Tool capability trait.

use crate::model::{ToolResultContent, ToolSpec};
use crate::tools::ToolError;
use serde_json::Value;

/// A named capability the model can invoke.
///
/// This is the boundary between the conversation loop and side effects.
/// Implementations validate their own input and report every expected
/// failure (bad arguments, missing paths, subprocess errors) as a
/// [`ToolError`] or inside the returned content, never by panicking.
///
/// `invoke` is synchronous and may block; the engine runs it off the async
/// executor. It must be safe to call again with the same input.
pub trait Tool: Send + Sync {
    /// Unique, non-empty name the model uses to request this tool.
    fn name(&self) -> &str;

    /// Description shown to the model.
    fn description(&self) -> &str;

    /// JSON Schema describing exactly the input `invoke` accepts.
    fn input_schema(&self) -> Value;

    /// Run the tool.
    fn invoke(&self, input: Value) -> Result<ToolResultContent, ToolError>;

    /// Definition advertised to the model.
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}
