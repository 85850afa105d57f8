//! Directory listing tool.

use crate::input::PathsInput;
use crate::workspace::Workspace;
use runtime::model::ToolResultContent;
use runtime::tools::{parse_input, schema_for};
use runtime::{Tool, ToolError};
use serde_json::Value;
use std::fs;
use std::path::Path;

const DESCRIPTION: &str = "\
List files under one or more directories.

You may specify one or more paths, relative to the root of the
repository you are working in. The output will contain the names
of files in those directories, as well as their sizes and number
of lines.
";

/// `list_paths`: list directory entries with byte and line counts.
pub struct ListPaths {
    workspace: Workspace,
}

impl ListPaths {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }

    fn list(&self, rel: &str, out: &mut Vec<String>) -> Result<(), ToolError> {
        let path = self.workspace.resolve(rel)?;

        if !path.is_dir() {
            if path.exists() {
                out.push(format!("Not a directory: {rel}\n"));
            } else {
                out.push(format!("No such file or directory: {rel}\n"));
            }
            return Ok(());
        }

        out.push(format!("Directory listing: {rel}/"));
        out.push("BYTES\tLINES\tNAME".to_string());

        let mut dirs = Vec::new();
        let mut files = Vec::new();
        for entry in fs::read_dir(&path).map_err(|e| io_error(rel, &e))? {
            let entry = entry.map_err(|e| io_error(rel, &e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let entry_path = entry.path();
            if entry_path.is_dir() {
                dirs.push(name);
            } else if entry_path.is_file() {
                files.push((name, entry_path));
            }
        }
        dirs.sort();
        files.sort();

        for name in dirs {
            out.push(format!("DIR\t\t{name}"));
        }
        for (name, entry_path) in files {
            let (bytes, lines) = count(&entry_path).map_err(|e| io_error(rel, &e))?;
            out.push(format!("{bytes}\t{lines}\t{name}"));
        }
        Ok(())
    }
}

/// Byte length and newline count of a file.
fn count(path: &Path) -> std::io::Result<(usize, usize)> {
    let data = fs::read(path)?;
    let lines = data.iter().filter(|&&b| b == b'\n').count();
    Ok((data.len(), lines))
}

fn io_error(rel: &str, err: &std::io::Error) -> ToolError {
    ToolError::Execution(format!("listing {rel}: {err}"))
}

impl Tool for ListPaths {
    fn name(&self) -> &str {
        "list_paths"
    }

    fn description(&self) -> &str {
        DESCRIPTION
    }

    fn input_schema(&self) -> Value {
        schema_for::<PathsInput>()
    }

    fn invoke(&self, input: Value) -> Result<ToolResultContent, ToolError> {
        let input: PathsInput = parse_input(input)?;

        let mut out = Vec::new();
        for rel in input.path.into_vec() {
            self.list(&rel, &mut out)?;
        }

        let mut text = out.join("\n");
        text.push('\n');
        Ok(ToolResultContent::Text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, ListPaths) {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("README.md"), "# title\n\nbody\n").unwrap();
        fs::write(dir.path().join("Cargo.toml"), "[package]").unwrap();
        fs::write(dir.path().join("src/lib.rs"), "fn main() {}\n").unwrap();
        let tool = ListPaths::new(Workspace::new(dir.path()));
        (dir, tool)
    }

    fn run(tool: &ListPaths, input: Value) -> String {
        tool.invoke(input).unwrap().text()
    }

    #[test]
    fn lists_dirs_first_then_files() {
        let (_dir, tool) = fixture();
        let out = run(&tool, json!({"path": "."}));
        assert_eq!(
            out,
            "Directory listing: ./\n\
             BYTES\tLINES\tNAME\n\
             DIR\t\tdocs\n\
             DIR\t\tsrc\n\
             9\t0\tCargo.toml\n\
             14\t3\tREADME.md\n"
        );
    }

    #[test]
    fn missing_path_is_reported_in_output() {
        let (_dir, tool) = fixture();
        let out = run(&tool, json!({"path": "enoent"}));
        assert!(out.contains("No such file or directory: enoent"));
    }

    #[test]
    fn file_path_is_not_a_directory() {
        let (_dir, tool) = fixture();
        let out = run(&tool, json!({"path": "README.md"}));
        assert!(out.contains("Not a directory: README.md"));
    }

    #[test]
    fn handles_several_paths_in_order() {
        let (_dir, tool) = fixture();
        let out = run(&tool, json!({"path": ["enoent", "src"]}));
        let missing = out.find("No such file or directory: enoent").unwrap();
        let listing = out.find("Directory listing: src/").unwrap();
        assert!(missing < listing);
        assert!(out.contains("13\t1\tlib.rs"));
    }

    #[test]
    fn malformed_input_is_invalid() {
        let (_dir, tool) = fixture();
        let err = tool.invoke(json!({"paths": "."})).unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }
}
