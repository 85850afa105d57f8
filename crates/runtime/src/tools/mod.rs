//! Tool capabilities and the registry that resolves them.

pub mod errors;
mod input;
mod registry;
mod tool;

pub use errors::ToolError;
pub use input::{parse_input, schema_for};
pub use registry::ToolRegistry;
pub use tool::Tool;
