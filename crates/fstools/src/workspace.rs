use runtime::ToolError;
use std::path::{Component, Path, PathBuf};

/// The directory tools operate in.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join a relative path onto the root.
    ///
    /// Absolute paths and `..` components that would climb above the root
    /// are rejected as invalid input. Symlinks are followed as-is.
    pub fn resolve(&self, rel: &str) -> Result<PathBuf, ToolError> {
        let mut normalized = PathBuf::new();
        for component in Path::new(rel).components() {
            match component {
                Component::Normal(part) => normalized.push(part),
                Component::CurDir => {}
                Component::ParentDir => {
                    if !normalized.pop() {
                        return Err(ToolError::InvalidInput(format!(
                            "path escapes the workspace: {rel}"
                        )));
                    }
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(ToolError::InvalidInput(format!(
                        "path must be relative: {rel}"
                    )));
                }
            }
        }
        Ok(self.root.join(normalized))
    }
}
