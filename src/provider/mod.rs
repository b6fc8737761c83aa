//! Model transport trait and implementations.

pub mod http;

#[cfg(feature = "openai")]
pub mod openai;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::AgentError;
use crate::types::{ChatDelta, GenerationSettings, Message, ToolChoice};

/// Ordered stream of deltas for one completion. The end of the stream is the
/// completion sentinel.
pub type DeltaStream = BoxStream<'static, Result<ChatDelta, AgentError>>;

/// A request sent to a model transport.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub tool_choice: ToolChoice,
    pub settings: GenerationSettings,
}

impl ChatRequest {
    /// Names of the tools offered with this request, in order.
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }
}

/// Tool definition sent to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Streaming chat-completions endpoint.
///
/// Implementations are opaque request/response streaming RPCs; dropping the
/// returned stream must close the underlying connection.
#[async_trait]
pub trait ModelTransport: Send + Sync {
    /// Transport name used in logs (e.g., "openai").
    fn name(&self) -> &str;

    /// Start a streaming completion.
    async fn stream_chat(&self, request: ChatRequest) -> Result<DeltaStream, AgentError>;
}
