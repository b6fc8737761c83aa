//! Workspace tools: file access, code search and shell commands.
//!
//! Every path argument is resolved through [`AgentContext::resolve_path`], so
//! a tool can never touch anything outside the session workspace.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ignore::WalkBuilder;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::agent::context::AgentContext;
use crate::error::AgentError;
use crate::util::{truncate_chars, with_timeout};

use super::schema::ToolParameters;

const READ_FILE_MAX_CHARS: usize = 65_536;
const COMMAND_OUTPUT_MAX_CHARS: usize = 32_768;
const LIST_MAX_ENTRIES: usize = 1_000;
const DEFAULT_SEARCH_RESULTS: usize = 50;
const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 30;

fn clip(text: &str, max_chars: usize) -> (String, bool) {
    let clipped = truncate_chars(text, max_chars);
    if clipped.len() == text.len() {
        (text.to_string(), false)
    } else {
        (format!("{clipped}\n... (truncated)"), true)
    }
}

fn walker(root: &Path, max_depth: Option<usize>) -> WalkBuilder {
    let mut builder = WalkBuilder::new(root);
    builder.hidden(true);
    builder.ignore(true);
    builder.git_ignore(true);
    builder.git_exclude(true);
    builder.require_git(false);
    builder.parents(true);
    builder.max_depth(max_depth);
    builder.sort_by_file_name(|a, b| a.cmp(b));
    builder
}

fn relative(workspace: &Path, path: &Path) -> String {
    path.strip_prefix(workspace)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}

/// Read a UTF-8 file, optionally limited to a 1-based inclusive line range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadFileTool {
    pub path: String,
    #[serde(default)]
    pub start_line: Option<usize>,
    #[serde(default)]
    pub end_line: Option<usize>,
}

impl ReadFileTool {
    pub fn parameters() -> ToolParameters {
        ToolParameters::object()
            .string("path", "File path relative to the workspace", true)
            .integer("start_line", "First line to return (1-based)", false)
            .integer("end_line", "Last line to return (inclusive)", false)
            .build()
    }

    pub(crate) async fn invoke(&self, ctx: &AgentContext) -> Result<String, AgentError> {
        let path = ctx.resolve_path(&self.path)?;
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| AgentError::tool("readfiletool", format!("{}: {e}", self.path)))?;

        let total_lines = content.lines().count();
        let selected = if self.start_line.is_some() || self.end_line.is_some() {
            let start = self.start_line.unwrap_or(1).max(1);
            let end = self.end_line.unwrap_or(total_lines).min(total_lines);
            if start > end {
                return Err(AgentError::tool(
                    "readfiletool",
                    format!("empty line range {start}..={end} ({total_lines} lines)"),
                ));
            }
            content
                .lines()
                .skip(start - 1)
                .take(end + 1 - start)
                .collect::<Vec<_>>()
                .join("\n")
        } else {
            content
        };

        let (display, truncated) = clip(&selected, READ_FILE_MAX_CHARS);
        Ok(json!({
            "path": self.path,
            "content": display,
            "total_lines": total_lines,
            "truncated": truncated,
        })
        .to_string())
    }
}

/// Write a file, creating missing parent directories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteFileTool {
    pub path: String,
    pub content: String,
}

impl WriteFileTool {
    pub fn parameters() -> ToolParameters {
        ToolParameters::object()
            .string("path", "File path relative to the workspace", true)
            .string("content", "Full content to write", true)
            .build()
    }

    pub(crate) async fn invoke(&self, ctx: &AgentContext) -> Result<String, AgentError> {
        let path = ctx.resolve_path(&self.path)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AgentError::tool(
                    "writefiletool",
                    format!("failed to create directories for {}: {e}", self.path),
                )
            })?;
        }
        tokio::fs::write(&path, &self.content)
            .await
            .map_err(|e| AgentError::tool("writefiletool", format!("{}: {e}", self.path)))?;

        Ok(json!({
            "path": self.path,
            "bytes_written": self.content.len(),
        })
        .to_string())
    }
}

/// List a directory, honouring ignore files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListDirectoryTool {
    #[serde(default = "current_dir")]
    pub path: String,
    #[serde(default)]
    pub recursive: bool,
}

fn current_dir() -> String {
    ".".to_string()
}

impl ListDirectoryTool {
    pub fn parameters() -> ToolParameters {
        ToolParameters::object()
            .string("path", "Directory relative to the workspace (defaults to '.')", false)
            .boolean("recursive", "List nested entries too", false)
            .build()
    }

    pub(crate) async fn invoke(&self, ctx: &AgentContext) -> Result<String, AgentError> {
        let root = ctx.resolve_path(&self.path)?;
        if !root.is_dir() {
            return Err(AgentError::tool(
                "listdirectorytool",
                format!("{} is not a directory", self.path),
            ));
        }
        let workspace = ctx.workspace().to_path_buf();
        let depth = if self.recursive { None } else { Some(1) };

        let entries = tokio::task::spawn_blocking(move || list_entries(&workspace, &root, depth))
            .await
            .map_err(|e| AgentError::tool("listdirectorytool", e.to_string()))?;

        let truncated = entries.len() > LIST_MAX_ENTRIES;
        let entries: Vec<_> = entries.into_iter().take(LIST_MAX_ENTRIES).collect();
        Ok(json!({
            "path": self.path,
            "count": entries.len(),
            "entries": entries,
            "truncated": truncated,
        })
        .to_string())
    }
}

fn list_entries(workspace: &Path, root: &Path, depth: Option<usize>) -> Vec<serde_json::Value> {
    walker(root, depth)
        .build()
        .filter_map(Result::ok)
        .filter(|entry| entry.depth() > 0)
        .map(|entry| {
            let kind = match entry.file_type() {
                Some(ft) if ft.is_dir() => "dir",
                Some(ft) if ft.is_file() => "file",
                _ => "other",
            };
            json!({ "path": relative(workspace, entry.path()), "type": kind })
        })
        .collect()
}

/// Regex search over workspace files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchCodeTool {
    pub pattern: String,
    #[serde(default = "current_dir")]
    pub path: String,
    #[serde(default)]
    pub max_results: Option<usize>,
}

impl SearchCodeTool {
    pub fn parameters() -> ToolParameters {
        ToolParameters::object()
            .string("pattern", "Regular expression to search for", true)
            .string("path", "Directory or file to search (defaults to '.')", false)
            .integer("max_results", "Maximum number of matching lines", false)
            .build()
    }

    pub(crate) async fn invoke(&self, ctx: &AgentContext) -> Result<String, AgentError> {
        let regex = Regex::new(&self.pattern).map_err(|e| AgentError::InvalidArguments {
            tool: "searchcodetool".into(),
            message: e.to_string(),
        })?;
        let root = ctx.resolve_path(&self.path)?;
        let workspace = ctx.workspace().to_path_buf();
        let limit = self.max_results.unwrap_or(DEFAULT_SEARCH_RESULTS).max(1);

        let (matches, truncated) =
            tokio::task::spawn_blocking(move || search(&workspace, &root, &regex, limit))
                .await
                .map_err(|e| AgentError::tool("searchcodetool", e.to_string()))?;

        Ok(json!({
            "pattern": self.pattern,
            "count": matches.len(),
            "matches": matches,
            "truncated": truncated,
        })
        .to_string())
    }
}

fn search(
    workspace: &Path,
    root: &Path,
    regex: &Regex,
    limit: usize,
) -> (Vec<serde_json::Value>, bool) {
    let mut matches = Vec::new();
    let files: Vec<PathBuf> = walker(root, None)
        .build()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
        .map(|entry| entry.into_path())
        .collect();

    for file in files {
        // Binary and non-UTF-8 files are skipped.
        let Ok(content) = std::fs::read_to_string(&file) else {
            continue;
        };
        for (number, line) in content.lines().enumerate() {
            if !regex.is_match(line) {
                continue;
            }
            if matches.len() == limit {
                return (matches, true);
            }
            matches.push(json!({
                "path": relative(workspace, &file),
                "line": number + 1,
                "text": truncate_chars(line.trim_end(), 400),
            }));
        }
    }
    (matches, false)
}

/// Run a shell command in the workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunCommandTool {
    pub command: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl RunCommandTool {
    pub fn parameters() -> ToolParameters {
        ToolParameters::object()
            .string("command", "Shell command, run with `sh -c` in the workspace", true)
            .integer("timeout_secs", "Deadline in seconds (defaults to 30)", false)
            .build()
    }

    pub(crate) async fn invoke(&self, ctx: &AgentContext) -> Result<String, AgentError> {
        let deadline = Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_COMMAND_TIMEOUT_SECS));
        let mut command = tokio::process::Command::new("sh");
        command
            .arg("-c")
            .arg(&self.command)
            .current_dir(ctx.workspace())
            .kill_on_drop(true);

        let output = with_timeout(deadline, async {
            command
                .output()
                .await
                .map_err(|e| AgentError::tool("runcommandtool", e.to_string()))
        })
        .await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let (stdout, stdout_truncated) = clip(&stdout, COMMAND_OUTPUT_MAX_CHARS);
        let (stderr, stderr_truncated) = clip(&stderr, COMMAND_OUTPUT_MAX_CHARS);

        Ok(json!({
            "exit_code": output.status.code(),
            "stdout": stdout,
            "stderr": stderr,
            "truncated": stdout_truncated || stderr_truncated,
        })
        .to_string())
    }
}
