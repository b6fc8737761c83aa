//! Prompt text for the coding agent.

use std::path::Path;

use crate::tools::ToolName;

/// System prompt listing the tools offered and the workspace root.
pub fn system_prompt(tools: &[ToolName], workspace: &Path) -> String {
    let tool_lines: String = tools
        .iter()
        .map(|t| format!("- {t}: {}\n", t.description()))
        .collect();
    format!(
        "You are a careful software engineering agent working in the repository at {workspace}.\n\
         \n\
         Each step has two parts. First you call reasoningtool to assess where you are \
         and what remains. Then you call exactly one action tool.\n\
         \n\
         Available tools:\n\
         {tool_lines}\
         \n\
         Rules:\n\
         - Paths are relative to the workspace. Nothing outside it is reachable.\n\
         - Read code before changing it and verify changes by running the relevant commands.\n\
         - Ask for clarification only when the request is genuinely ambiguous.\n\
         - When the task is done, or cannot be done, call finalanswertool with a concise answer.\n",
        workspace = workspace.display(),
    )
}

/// First user message of a session.
pub fn initial_request(task: &str) -> String {
    format!("Task:\n{task}\n\nStart by reasoning about what you need to find out.")
}
