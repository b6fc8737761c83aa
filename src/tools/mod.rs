//! The closed set of agent actions.
//!
//! Every action is a plain serde struct with its own JSON Schema. A sealed
//! tool call is turned into an [`AgentAction`] by the [`ToolRegistry`] and
//! invoked against the session's [`AgentContext`].

pub mod registry;
pub mod schema;
pub mod system;
pub mod validation;
pub mod workspace;

pub use registry::ToolRegistry;
pub use schema::{ParameterBuilder, ToolParameters};
pub use system::{ClarificationTool, FinalAnswerTool, FinalStatus, ReasoningTool};
pub use validation::validate_arguments;
pub use workspace::{ListDirectoryTool, ReadFileTool, RunCommandTool, SearchCodeTool, WriteFileTool};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::agent::context::AgentContext;
use crate::error::AgentError;
use crate::provider::ToolDefinition;

/// Wire names of the available tools.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ToolName {
    ReasoningTool,
    FinalAnswerTool,
    ClarificationTool,
    ReadFileTool,
    WriteFileTool,
    ListDirectoryTool,
    SearchCodeTool,
    RunCommandTool,
}

impl ToolName {
    /// Every tool, in declaration order.
    pub fn all() -> Vec<ToolName> {
        ToolName::iter().collect()
    }

    /// Wire name, as sent to the model.
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::ReasoningTool => {
                "Assess the current situation and plan the next steps before acting"
            }
            Self::FinalAnswerTool => "Finish the task and report the result to the user",
            Self::ClarificationTool => {
                "Ask the user clarifying questions when the request is ambiguous"
            }
            Self::ReadFileTool => "Read a file from the workspace, optionally a line range",
            Self::WriteFileTool => "Write a file in the workspace, creating directories as needed",
            Self::ListDirectoryTool => "List files and directories in the workspace",
            Self::SearchCodeTool => "Search workspace files with a regular expression",
            Self::RunCommandTool => "Run a shell command in the workspace",
        }
    }

    pub fn parameters(self) -> ToolParameters {
        match self {
            Self::ReasoningTool => ReasoningTool::parameters(),
            Self::FinalAnswerTool => FinalAnswerTool::parameters(),
            Self::ClarificationTool => ClarificationTool::parameters(),
            Self::ReadFileTool => ReadFileTool::parameters(),
            Self::WriteFileTool => WriteFileTool::parameters(),
            Self::ListDirectoryTool => ListDirectoryTool::parameters(),
            Self::SearchCodeTool => SearchCodeTool::parameters(),
            Self::RunCommandTool => RunCommandTool::parameters(),
        }
    }

    pub fn definition(self) -> ToolDefinition {
        ToolDefinition {
            name: self.to_string(),
            description: self.description().to_string(),
            parameters: self.parameters().schema,
        }
    }
}

/// A parsed, validated tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentAction {
    Reasoning(ReasoningTool),
    FinalAnswer(FinalAnswerTool),
    Clarification(ClarificationTool),
    ReadFile(ReadFileTool),
    WriteFile(WriteFileTool),
    ListDirectory(ListDirectoryTool),
    SearchCode(SearchCodeTool),
    RunCommand(RunCommandTool),
}

impl AgentAction {
    /// Deserialize already-validated arguments for `name`.
    pub fn from_arguments(
        name: ToolName,
        arguments: serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        Ok(match name {
            ToolName::ReasoningTool => Self::Reasoning(serde_json::from_value(arguments)?),
            ToolName::FinalAnswerTool => Self::FinalAnswer(serde_json::from_value(arguments)?),
            ToolName::ClarificationTool => Self::Clarification(serde_json::from_value(arguments)?),
            ToolName::ReadFileTool => Self::ReadFile(serde_json::from_value(arguments)?),
            ToolName::WriteFileTool => Self::WriteFile(serde_json::from_value(arguments)?),
            ToolName::ListDirectoryTool => Self::ListDirectory(serde_json::from_value(arguments)?),
            ToolName::SearchCodeTool => Self::SearchCode(serde_json::from_value(arguments)?),
            ToolName::RunCommandTool => Self::RunCommand(serde_json::from_value(arguments)?),
        })
    }

    pub fn name(&self) -> ToolName {
        match self {
            Self::Reasoning(_) => ToolName::ReasoningTool,
            Self::FinalAnswer(_) => ToolName::FinalAnswerTool,
            Self::Clarification(_) => ToolName::ClarificationTool,
            Self::ReadFile(_) => ToolName::ReadFileTool,
            Self::WriteFile(_) => ToolName::WriteFileTool,
            Self::ListDirectory(_) => ToolName::ListDirectoryTool,
            Self::SearchCode(_) => ToolName::SearchCodeTool,
            Self::RunCommand(_) => ToolName::RunCommandTool,
        }
    }

    /// Canonical JSON arguments, as recorded in the conversation.
    pub fn arguments_json(&self) -> Result<String, AgentError> {
        let text = match self {
            Self::Reasoning(t) => serde_json::to_string(t),
            Self::FinalAnswer(t) => serde_json::to_string(t),
            Self::Clarification(t) => serde_json::to_string(t),
            Self::ReadFile(t) => serde_json::to_string(t),
            Self::WriteFile(t) => serde_json::to_string(t),
            Self::ListDirectory(t) => serde_json::to_string(t),
            Self::SearchCode(t) => serde_json::to_string(t),
            Self::RunCommand(t) => serde_json::to_string(t),
        }?;
        Ok(text)
    }

    /// Run the action. The context is borrowed only for this call.
    pub async fn invoke(&self, ctx: &mut AgentContext) -> Result<String, AgentError> {
        match self {
            Self::Reasoning(t) => t.invoke(),
            Self::FinalAnswer(t) => t.invoke(ctx),
            Self::Clarification(t) => t.invoke(ctx),
            Self::ReadFile(t) => t.invoke(ctx).await,
            Self::WriteFile(t) => t.invoke(ctx).await,
            Self::ListDirectory(t) => t.invoke(ctx).await,
            Self::SearchCode(t) => t.invoke(ctx).await,
            Self::RunCommand(t) => t.invoke(ctx).await,
        }
    }
}
