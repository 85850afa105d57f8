//! Filesystem tools for skiff conversations.
//!
//! Every tool is rooted at a [`Workspace`] directory and takes paths
//! relative to it. Expected conditions such as a missing path or a search
//! with no hits are reported in the tool's text output; only malformed
//! input and I/O failures surface as [`ToolError`](runtime::ToolError)s.
//!
//! - [`ListPaths`] (`list_paths`): directory listings with sizes and line counts.
//! - [`ReadFiles`] (`read_files`): file contents wrapped in delimiters.
//! - [`SearchFiles`] (`search_files`): regex search across the tree.

mod input;
mod list;
mod read;
mod search;
mod workspace;

pub use list::ListPaths;
pub use read::ReadFiles;
pub use search::{DEFAULT_MAX_RESULTS, NO_MATCHES, SearchFiles};
pub use workspace::Workspace;

use runtime::Tool;
use std::sync::Arc;

/// All filesystem tools for a workspace, ready for a registry.
pub fn workspace_tools(workspace: &Workspace, search_max_results: usize) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(ListPaths::new(workspace.clone())),
        Arc::new(ReadFiles::new(workspace.clone())),
        Arc::new(SearchFiles::new(workspace.clone()).max_results(search_max_results)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use runtime::ToolRegistry;

    #[test]
    fn tools_register_without_conflicts() {
        let workspace = Workspace::new(".");
        let registry = ToolRegistry::from_tools(workspace_tools(&workspace, 10)).unwrap();
        assert_eq!(registry.names(), ["list_paths", "read_files", "search_files"]);
        for spec in registry.specs() {
            assert_eq!(spec.input_schema["type"], "object", "{}", spec.name);
        }
    }
}
