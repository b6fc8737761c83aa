//! OpenAI Chat Completions streaming transport.

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::AgentError;
use crate::types::{ChatDelta, FinishReason, Message, Role, ToolCallFragment, ToolChoice};

use super::http::{
    bearer_headers, parse_sse_data, shared_client, status_to_error, LineBuffer, SseData,
};
use super::{ChatRequest, DeltaStream, ModelTransport};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Chat-completions transport for OpenAI and compatible servers.
pub struct OpenAiChatTransport {
    api_key: String,
    base_url: String,
}

impl OpenAiChatTransport {
    pub fn new(api_key: impl Into<String>, base_url: Option<String>) -> Self {
        let base_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Serialize a request into the chat-completions wire format.
pub fn build_request_body(request: &ChatRequest) -> Value {
    let mut body = Map::new();
    body.insert("model".into(), request.model.clone().into());
    body.insert(
        "messages".into(),
        request.messages.iter().map(message_to_openai).collect::<Vec<_>>().into(),
    );
    body.insert("stream".into(), true.into());

    let settings = &request.settings;
    if let Some(max) = settings.max_tokens {
        body.insert("max_tokens".into(), max.into());
    }
    if let Some(temp) = settings.temperature {
        body.insert("temperature".into(), temp.into());
    }
    if let Some(top_p) = settings.top_p {
        body.insert("top_p".into(), top_p.into());
    }
    if let Some(seed) = settings.seed {
        body.insert("seed".into(), seed.into());
    }

    if !request.tools.is_empty() {
        let tools: Vec<Value> = request
            .tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    }
                })
            })
            .collect();
        body.insert("tools".into(), tools.into());
        let choice = match &request.tool_choice {
            ToolChoice::Forced(name) => json!({ "type": "function", "function": { "name": name } }),
            ToolChoice::Required => json!("required"),
            ToolChoice::None => json!("none"),
        };
        body.insert("tool_choice".into(), choice);
    }

    Value::Object(body)
}

fn message_to_openai(msg: &Message) -> Value {
    match msg.role {
        Role::Tool => json!({
            "role": "tool",
            "tool_call_id": msg.tool_call_id,
            "content": msg.text_content(),
        }),
        Role::Assistant if !msg.tool_calls.is_empty() => {
            let calls: Vec<Value> = msg
                .tool_calls
                .iter()
                .map(|tc| {
                    json!({
                        "id": tc.id,
                        "type": "function",
                        "function": { "name": tc.name, "arguments": tc.arguments },
                    })
                })
                .collect();
            json!({
                "role": "assistant",
                "content": msg.content,
                "tool_calls": calls,
            })
        }
        role => {
            let role = match role {
                Role::System => "system",
                Role::User => "user",
                _ => "assistant",
            };
            json!({ "role": role, "content": msg.text_content() })
        }
    }
}

/// Convert one parsed SSE payload into a delta. `Ok(None)` for chunks that
/// carry nothing for the first choice (usage-only chunks, role headers).
fn chunk_to_delta(chunk: OpenAiStreamChunk) -> Result<Option<ChatDelta>, AgentError> {
    if let Some(error) = chunk.error {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(AgentError::Stream(message));
    }
    let Some(choice) = chunk.choices.into_iter().next() else {
        return Ok(None);
    };
    let tool_calls: Vec<ToolCallFragment> = choice
        .delta
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(position, tc)| {
            let function = tc.function.unwrap_or_default();
            ToolCallFragment {
                index: tc.index.unwrap_or(position),
                id: tc.id.filter(|id| !id.is_empty()),
                name: function.name,
                arguments: function.arguments,
            }
        })
        .collect();
    let finish_reason = choice.finish_reason.as_deref().and_then(|s| s.parse::<FinishReason>().ok());
    let content = choice.delta.content.filter(|c| !c.is_empty());
    if content.is_none() && tool_calls.is_empty() && finish_reason.is_none() {
        return Ok(None);
    }
    Ok(Some(ChatDelta {
        content,
        tool_calls,
        finish_reason,
    }))
}

#[async_trait]
impl ModelTransport for OpenAiChatTransport {
    fn name(&self) -> &str {
        "openai"
    }

    async fn stream_chat(&self, request: ChatRequest) -> Result<DeltaStream, AgentError> {
        let body = build_request_body(&request);
        let url = format!("{}/chat/completions", self.base_url);

        debug!(
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "OpenAI stream_chat"
        );

        let resp = shared_client()
            .post(&url)
            .headers(bearer_headers(&self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body_text));
        }

        let byte_stream = resp.bytes_stream();

        let stream = async_stream::stream! {
            let mut buffer = LineBuffer::new();
            futures::pin_mut!(byte_stream);

            'read: while let Some(chunk_result) = byte_stream.next().await {
                let chunk = match chunk_result {
                    Ok(c) => c,
                    Err(e) => {
                        yield Err(AgentError::Network(e));
                        break;
                    }
                };

                buffer.push(&chunk);

                while let Some(line) = buffer.next_line() {
                    if line.is_empty() || line.starts_with(':') {
                        continue;
                    }

                    match parse_sse_data(&line) {
                        Some(SseData::Done) => break 'read,
                        Some(SseData::Payload(data)) => {
                            match serde_json::from_str::<OpenAiStreamChunk>(data) {
                                Ok(chunk) => match chunk_to_delta(chunk) {
                                    Ok(Some(delta)) => yield Ok(delta),
                                    Ok(None) => {}
                                    Err(err) => {
                                        yield Err(err);
                                        break 'read;
                                    }
                                },
                                Err(err) => debug!(%err, "skipping unparseable chunk"),
                            }
                        }
                        None => {}
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

// OpenAI API stream types (internal)

#[derive(Deserialize)]
struct OpenAiStreamChunk {
    #[serde(default)]
    choices: Vec<OpenAiStreamChoice>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Deserialize)]
struct OpenAiStreamChoice {
    #[serde(default)]
    delta: OpenAiStreamDelta,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
struct OpenAiStreamDelta {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAiToolCallChunk>>,
}

#[derive(Deserialize)]
struct OpenAiToolCallChunk {
    index: Option<usize>,
    id: Option<String>,
    function: Option<OpenAiFunctionChunk>,
}

#[derive(Deserialize, Default)]
struct OpenAiFunctionChunk {
    name: Option<String>,
    arguments: Option<String>,
}
