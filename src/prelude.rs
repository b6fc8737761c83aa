//! Convenience re-exports for common use.

pub use crate::agent::{
    AgentContext, AgentLoop, AgentLoopConfig, AgentState, SessionHandle, SessionOutcome,
    TruncationPolicy,
};
pub use crate::config::AgentSettings;
pub use crate::error::{AgentError, Result};
pub use crate::provider::{ChatRequest, DeltaStream, ModelTransport, ToolDefinition};
pub use crate::stream::{OutputStream, OutputSubscriber};
pub use crate::tools::{AgentAction, ToolName, ToolRegistry};
pub use crate::types::{
    ChatDelta, GenerationSettings, Message, Role, StreamEvent, ToolCallFragment, ToolChoice,
};
