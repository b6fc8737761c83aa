//! Streaming types: transport deltas in, decoded events out.

use serde::{Deserialize, Serialize};

use super::generation::FinishReason;

/// One incremental fragment of a streamed chat completion.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChatDelta {
    /// Plain-text content fragment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Tool-call fragments carried by this delta.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallFragment>,
    /// Finish reason (only on the last delta of a choice).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

impl ChatDelta {
    /// A delta carrying only text.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
            ..Default::default()
        }
    }

    /// A delta carrying a single tool-call fragment.
    pub fn tool(fragment: ToolCallFragment) -> Self {
        Self {
            tool_calls: vec![fragment],
            ..Default::default()
        }
    }
}

/// A partial tool call as it arrives on the wire.
///
/// Transports send the id and name on the first fragment of a call and only
/// the position afterwards; any field may be absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ToolCallFragment {
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

impl ToolCallFragment {
    /// Opening fragment naming a call.
    pub fn start(index: usize, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            index,
            id: Some(id.into()),
            name: Some(name.into()),
            arguments: None,
        }
    }

    /// Argument fragment addressed by position only.
    pub fn args(index: usize, arguments: impl Into<String>) -> Self {
        Self {
            index,
            id: None,
            name: None,
            arguments: Some(arguments.into()),
        }
    }

    /// Argument fragment addressed by id.
    pub fn args_for(index: usize, id: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            index,
            id: Some(id.into()),
            name: None,
            arguments: Some(arguments.into()),
        }
    }
}

/// Progress event fanned out to output consumers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Display text (model prose or synthesized result previews).
    RawText { text: String },
    /// A tool call has been named.
    ToolHeader { id: String, name: String },
    /// A tool call's arguments grew but are not yet valid JSON.
    ToolProgress {
        id: String,
        /// Best-effort view of the incomplete arguments, for display only.
        partial: Option<serde_json::Value>,
    },
    /// A tool call's arguments became valid JSON.
    ToolFinalized {
        id: String,
        name: String,
        arguments: serde_json::Value,
    },
    /// End of stream.
    Done,
}
