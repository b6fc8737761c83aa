//! Control-flow tools: reasoning, clarification and the final answer.

use serde::{Deserialize, Serialize};

use crate::agent::context::{AgentContext, AgentState};
use crate::error::AgentError;

use super::schema::ToolParameters;

/// Structured self-assessment forced at the start of every iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningTool {
    #[serde(default)]
    pub reasoning_steps: Vec<String>,
    pub current_situation: String,
    #[serde(default)]
    pub plan_status: String,
    #[serde(default)]
    pub enough_data: bool,
    #[serde(default)]
    pub remaining_steps: Vec<String>,
    pub task_completed: bool,
}

impl ReasoningTool {
    pub fn parameters() -> ToolParameters {
        ToolParameters::object()
            .string_array("reasoning_steps", "Step-by-step reasoning about the current state", true)
            .string("current_situation", "What has been done and observed so far", true)
            .string("plan_status", "Status of the overall plan", true)
            .boolean("enough_data", "Whether enough information has been gathered", true)
            .string_array("remaining_steps", "Next steps, most immediate first", true)
            .boolean("task_completed", "Whether the task is fully done", true)
            .build()
    }

    /// First remaining step, used as the content of the action message.
    pub fn next_step(&self) -> Option<&str> {
        self.remaining_steps.first().map(String::as_str)
    }

    pub(crate) fn invoke(&self) -> Result<String, AgentError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Pause the session and ask the user questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClarificationTool {
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub unclear_terms: Vec<String>,
    #[serde(default)]
    pub assumptions: Vec<String>,
    pub questions: Vec<String>,
}

impl ClarificationTool {
    pub fn parameters() -> ToolParameters {
        ToolParameters::object()
            .string("reasoning", "Why clarification is needed", true)
            .string_array("unclear_terms", "Terms or requirements that are ambiguous", false)
            .string_array("assumptions", "Assumptions that would be made otherwise", false)
            .string_array("questions", "Questions for the user", true)
            .build()
    }

    pub(crate) fn invoke(&self, ctx: &mut AgentContext) -> Result<String, AgentError> {
        ctx.clarifications_used += 1;
        Ok(self.questions.join("\n"))
    }
}

/// Outcome reported by the final answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalStatus {
    #[default]
    Completed,
    Failed,
}

/// Terminal action carrying the answer for the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalAnswerTool {
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub completed_steps: Vec<String>,
    pub answer: String,
    #[serde(default)]
    pub status: FinalStatus,
}

impl FinalAnswerTool {
    pub fn parameters() -> ToolParameters {
        ToolParameters::object()
            .string("reasoning", "Why the task is finished", true)
            .string_array("completed_steps", "Steps that were carried out", true)
            .string("answer", "Final answer for the user", true)
            .string_enum("status", "Outcome of the task", &["completed", "failed"], true)
            .build()
    }

    /// Final answer synthesized from a plain-text completion.
    pub fn from_text(text: &str) -> Self {
        let answer = if text.trim().is_empty() {
            "Task completed".to_string()
        } else {
            text.to_string()
        };
        Self {
            reasoning: "Agent decided to complete".to_string(),
            completed_steps: vec![answer.clone()],
            answer,
            status: FinalStatus::Completed,
        }
    }

    pub(crate) fn invoke(&self, ctx: &mut AgentContext) -> Result<String, AgentError> {
        ctx.set_state(match self.status {
            FinalStatus::Completed => AgentState::Completed,
            FinalStatus::Failed => AgentState::Failed,
        });
        Ok(self.answer.clone())
    }
}
