//! Regex search tool.

use crate::workspace::Workspace;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use regex::Regex;
use runtime::model::ToolResultContent;
use runtime::tools::{parse_input, schema_for};
use runtime::{Tool, ToolError};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Result lines returned before the rest are summarized.
pub const DEFAULT_MAX_RESULTS: usize = 1000;

/// Output when nothing matches.
pub const NO_MATCHES: &str = "No matches found.";

const DESCRIPTION: &str = "\
Search files for lines matching a regular expression.

Searches the whole repository by default, or only under `path`
when given. `globs` restricts which files are searched; prefix a
glob with `!` to exclude matching files. Hidden and ignored files
are skipped. Each result line has the form `file:line:text`.
";

#[derive(Debug, Deserialize, JsonSchema)]
struct SearchInput {
    /// Regular expression to search for.
    pattern: String,
    /// Directory or file to search, relative to the repository root.
    #[serde(default)]
    path: Option<String>,
    /// Glob filters on file paths, e.g. `*.rs` or `!tests/**`.
    #[serde(default)]
    globs: Vec<String>,
}

/// `search_files`: regex search across the workspace.
pub struct SearchFiles {
    workspace: Workspace,
    max_results: usize,
}

impl SearchFiles {
    pub fn new(workspace: Workspace) -> Self {
        Self {
            workspace,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    /// Cap on result lines; further matches are only counted.
    pub fn max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    fn search(&self, input: SearchInput) -> Result<String, ToolError> {
        let regex = Regex::new(&input.pattern)
            .map_err(|e| ToolError::InvalidInput(format!("bad pattern: {e}")))?;
        let filter = GlobFilter::new(&input.globs)?;

        let rel = input.path.as_deref().unwrap_or(".");
        let start = self.workspace.resolve(rel)?;
        if !start.exists() {
            return Err(ToolError::Execution(format!(
                "No such file or directory: {rel}"
            )));
        }

        let root = self.workspace.root();
        let mut shown = Vec::new();
        let mut total = 0usize;

        let walker = WalkBuilder::new(&start)
            .follow_links(true)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            let path = entry.path();
            let display = path.strip_prefix(root).unwrap_or(path);
            if !filter.allows(display) {
                continue;
            }

            let data = match fs::read(path) {
                Ok(data) => data,
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "skipping unreadable file");
                    continue;
                }
            };
            if data.contains(&0) {
                continue;
            }

            let text = String::from_utf8_lossy(&data);
            for (index, line) in text.lines().enumerate() {
                if !regex.is_match(line) {
                    continue;
                }
                total += 1;
                if shown.len() < self.max_results {
                    shown.push(format!("{}:{}:{line}", display.display(), index + 1));
                }
            }
        }

        if total == 0 {
            return Ok(NO_MATCHES.to_string());
        }

        let hidden = total - shown.len();
        if hidden > 0 {
            shown.push(format!("[{hidden} more matches hidden]"));
        }
        let mut out = shown.join("\n");
        out.push('\n');
        Ok(out)
    }
}

/// Include and exclude glob sets. With no include globs every file passes.
struct GlobFilter {
    include: Option<GlobSet>,
    exclude: GlobSet,
}

impl GlobFilter {
    fn new(globs: &[String]) -> Result<Self, ToolError> {
        let mut include = GlobSetBuilder::new();
        let mut exclude = GlobSetBuilder::new();
        let mut has_include = false;

        for raw in globs {
            let (builder, pattern) = match raw.strip_prefix('!') {
                Some(pattern) => (&mut exclude, pattern),
                None => {
                    has_include = true;
                    (&mut include, raw.as_str())
                }
            };
            let glob = Glob::new(pattern)
                .map_err(|e| ToolError::InvalidInput(format!("bad glob {raw}: {e}")))?;
            builder.add(glob);
        }

        let build = |builder: GlobSetBuilder| {
            builder
                .build()
                .map_err(|e| ToolError::InvalidInput(format!("bad globs: {e}")))
        };
        Ok(Self {
            include: if has_include { Some(build(include)?) } else { None },
            exclude: build(exclude)?,
        })
    }

    /// Matches against the relative path or, failing that, the file name.
    fn allows(&self, rel: &Path) -> bool {
        let hit = |set: &GlobSet| {
            set.is_match(rel) || rel.file_name().is_some_and(|name| set.is_match(name))
        };
        self.include.as_ref().is_none_or(hit) && !hit(&self.exclude)
    }
}

impl Tool for SearchFiles {
    fn name(&self) -> &str {
        "search_files"
    }

    fn description(&self) -> &str {
        DESCRIPTION
    }

    fn input_schema(&self) -> Value {
        schema_for::<SearchInput>()
    }

    fn invoke(&self, input: Value) -> Result<ToolResultContent, ToolError> {
        let input: SearchInput = parse_input(input)?;
        self.search(input).map(ToolResultContent::Text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src/nested")).unwrap();
        fs::write(dir.path().join("src/lib.rs"), "fn alpha() {}\nfn beta() {}\n").unwrap();
        fs::write(dir.path().join("src/nested/mod.rs"), "// alpha here\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "alpha notes\n").unwrap();
        fs::write(dir.path().join("blob.bin"), b"alpha\0binary").unwrap();
        dir
    }

    fn run(dir: &TempDir, max_results: usize, input: Value) -> Result<String, ToolError> {
        SearchFiles::new(Workspace::new(dir.path()))
            .max_results(max_results)
            .invoke(input)
            .map(|content| content.text())
    }

    #[test]
    fn reports_file_and_line_in_path_order() {
        let dir = fixture();
        let out = run(&dir, 100, json!({"pattern": "alpha"})).unwrap();
        assert_eq!(
            out,
            "notes.txt:1:alpha notes\n\
             src/lib.rs:1:fn alpha() {}\n\
             src/nested/mod.rs:1:// alpha here\n"
        );
    }

    #[test]
    fn zero_matches_return_sentinel() {
        let dir = fixture();
        let out = run(&dir, 100, json!({"pattern": "gamma"})).unwrap();
        assert_eq!(out, NO_MATCHES);
    }

    #[test]
    fn results_beyond_cap_are_counted() {
        let dir = TempDir::new().unwrap();
        let body: String = (1..=25).map(|i| format!("hit {i}\n")).collect();
        fs::write(dir.path().join("many.txt"), body).unwrap();

        let out = run(&dir, 10, json!({"pattern": "^hit"})).unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 11);
        assert_eq!(lines[0], "many.txt:1:hit 1");
        assert_eq!(lines[9], "many.txt:10:hit 10");
        assert_eq!(lines[10], "[15 more matches hidden]");
    }

    #[test]
    fn exactly_cap_matches_has_no_marker() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("few.txt"), "hit\nhit\n").unwrap();
        let out = run(&dir, 2, json!({"pattern": "hit"})).unwrap();
        assert_eq!(out.lines().count(), 2);
        assert!(!out.contains("hidden"));
    }

    #[test]
    fn globs_include_and_exclude() {
        let dir = fixture();

        let only_rs = run(&dir, 100, json!({"pattern": "alpha", "globs": ["*.rs"]})).unwrap();
        assert!(!only_rs.contains("notes.txt"));
        assert!(only_rs.contains("src/lib.rs"));

        let no_nested = run(
            &dir,
            100,
            json!({"pattern": "alpha", "globs": ["!src/nested/**"]}),
        )
        .unwrap();
        assert!(no_nested.contains("notes.txt"));
        assert!(!no_nested.contains("mod.rs"));
    }

    #[test]
    fn path_narrows_search() {
        let dir = fixture();
        let out = run(&dir, 100, json!({"pattern": "alpha", "path": "src/nested"})).unwrap();
        assert_eq!(out, "src/nested/mod.rs:1:// alpha here\n");
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_entries_do_not_discard_matches() {
        let dir = fixture();
        std::os::unix::fs::symlink(dir.path().join("gone.txt"), dir.path().join("dangling.txt"))
            .unwrap();
        std::os::unix::fs::symlink(dir.path().join("notes.txt"), dir.path().join("linked.txt"))
            .unwrap();

        let out = run(&dir, 100, json!({"pattern": "alpha notes"})).unwrap();
        assert_eq!(out, "linked.txt:1:alpha notes\nnotes.txt:1:alpha notes\n");
    }

    #[test]
    fn bad_pattern_is_invalid_input() {
        let dir = fixture();
        let err = run(&dir, 100, json!({"pattern": "("})).unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }

    #[test]
    fn missing_search_path_is_an_error_result() {
        let dir = fixture();
        let err = run(&dir, 100, json!({"pattern": "alpha", "path": "enoent"})).unwrap_err();
        assert!(matches!(err, ToolError::Execution(msg) if msg.contains("No such file or directory")));
    }
}
