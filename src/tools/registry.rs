//! Enabled toolkit and sealed-call parsing.

use serde_json::Value;
use tracing::debug;

use crate::agent::context::AgentContext;
use crate::error::AgentError;
use crate::provider::ToolDefinition;

use super::validation::validate_arguments;
use super::{AgentAction, ToolName};

/// The tools a session may use.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    toolkit: Vec<ToolName>,
    max_clarifications: usize,
}

impl ToolRegistry {
    /// Reasoning and final-answer tools are always added when missing.
    pub fn new(toolkit: impl IntoIterator<Item = ToolName>, max_clarifications: usize) -> Self {
        let mut names: Vec<ToolName> = Vec::new();
        for name in [ToolName::ReasoningTool, ToolName::FinalAnswerTool]
            .into_iter()
            .chain(toolkit)
        {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        Self {
            toolkit: names,
            max_clarifications,
        }
    }

    pub fn toolkit(&self) -> &[ToolName] {
        &self.toolkit
    }

    pub fn max_clarifications(&self) -> usize {
        self.max_clarifications
    }

    /// Tools offered for the next request. The clarification tool disappears
    /// once the budget is spent.
    pub fn offered(&self, ctx: &AgentContext) -> Vec<ToolName> {
        let exhausted = ctx.clarifications_used >= self.max_clarifications;
        self.toolkit
            .iter()
            .copied()
            .filter(|name| !(exhausted && *name == ToolName::ClarificationTool))
            .collect()
    }

    pub fn definitions(&self, ctx: &AgentContext) -> Vec<ToolDefinition> {
        self.offered(ctx).into_iter().map(ToolName::definition).collect()
    }

    /// Turn a sealed call into a typed action: lookup, schema validation,
    /// then deserialization.
    pub fn parse(&self, name: &str, arguments: &Value) -> Result<AgentAction, AgentError> {
        let tool = name
            .parse::<ToolName>()
            .ok()
            .filter(|tool| self.toolkit.contains(tool))
            .ok_or_else(|| AgentError::UnknownTool(name.to_string()))?;

        validate_arguments(arguments, &tool.parameters().schema).map_err(|message| {
            AgentError::InvalidArguments {
                tool: name.to_string(),
                message,
            }
        })?;

        let action = AgentAction::from_arguments(tool, arguments.clone()).map_err(|e| {
            AgentError::InvalidArguments {
                tool: name.to_string(),
                message: e.to_string(),
            }
        })?;
        debug!(tool = %tool, "parsed tool call");
        Ok(action)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new(ToolName::all(), 5)
    }
}
