//! File reading tool.

use crate::input::PathsInput;
use crate::workspace::Workspace;
use runtime::model::ToolResultContent;
use runtime::tools::{parse_input, schema_for};
use runtime::{Tool, ToolError};
use serde_json::Value;
use std::fs;

const DESCRIPTION: &str = "\
Read one or more files.

You may specify one or more paths, relative to the root of the
repository.
";

/// `read_files`: return file contents wrapped in `<file-contents>` tags.
pub struct ReadFiles {
    workspace: Workspace,
}

impl ReadFiles {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }

    fn read(&self, rel: &str, out: &mut String) -> Result<(), ToolError> {
        let path = self.workspace.resolve(rel)?;

        if !path.is_file() {
            if path.exists() {
                out.push_str(&format!("Not a file: {rel}\n\n"));
            } else {
                out.push_str(&format!("No such file or directory: {rel}\n\n"));
            }
            return Ok(());
        }

        let data = fs::read(&path)
            .map_err(|e| ToolError::Execution(format!("reading {rel}: {e}")))?;
        let body = String::from_utf8_lossy(&data);

        out.push_str(&format!("<file-contents path='{}'>\n", escape(rel)));
        out.push_str(&body);
        if !body.ends_with('\n') {
            out.push('\n');
        }
        out.push_str("</file-contents>\n");
        Ok(())
    }
}

/// HTML-escape text for use inside a single-quoted attribute.
fn escape(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            c => escaped.push(c),
        }
    }
    escaped
}

impl Tool for ReadFiles {
    fn name(&self) -> &str {
        "read_files"
    }

    fn description(&self) -> &str {
        DESCRIPTION
    }

    fn input_schema(&self) -> Value {
        schema_for::<PathsInput>()
    }

    fn invoke(&self, input: Value) -> Result<ToolResultContent, ToolError> {
        let input: PathsInput = parse_input(input)?;

        let mut out = String::new();
        for rel in input.path.into_vec() {
            self.read(&rel, &mut out)?;
        }
        Ok(ToolResultContent::Text(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, ReadFiles) {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("lib")).unwrap();
        fs::write(dir.path().join("lib/a.c"), "int a;\n").unwrap();
        fs::write(dir.path().join("no_newline.txt"), "tail").unwrap();
        fs::write(dir.path().join("it's<odd>.txt"), "x\n").unwrap();
        let tool = ReadFiles::new(Workspace::new(dir.path()));
        (dir, tool)
    }

    fn run(tool: &ReadFiles, input: Value) -> String {
        tool.invoke(input).unwrap().text()
    }

    #[test]
    fn wraps_contents_literally() {
        let (_dir, tool) = fixture();
        assert_eq!(
            run(&tool, json!({"path": "lib/a.c"})),
            "<file-contents path='lib/a.c'>\nint a;\n</file-contents>\n"
        );
    }

    #[test]
    fn adds_missing_trailing_newline() {
        let (_dir, tool) = fixture();
        assert_eq!(
            run(&tool, json!({"path": "no_newline.txt"})),
            "<file-contents path='no_newline.txt'>\ntail\n</file-contents>\n"
        );
    }

    #[test]
    fn escapes_path_in_delimiter() {
        let (_dir, tool) = fixture();
        let out = run(&tool, json!({"path": "it's<odd>.txt"}));
        assert!(out.starts_with("<file-contents path='it&#x27;s&lt;odd&gt;.txt'>\n"));
    }

    #[test]
    fn reports_directories_and_missing_files() {
        let (_dir, tool) = fixture();
        let out = run(&tool, json!({"path": ["lib", "enoent", "lib/a.c"]}));
        assert!(out.starts_with("Not a file: lib\n\nNo such file or directory: enoent\n\n"));
        assert!(out.ends_with("int a;\n</file-contents>\n"));
    }
}
