//! Shared test helpers and scripted transport.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream;
use serde_json::{json, Value};

use vampi::error::AgentError;
use vampi::provider::{ChatRequest, DeltaStream, ModelTransport};
use vampi::types::{ChatDelta, ToolCallFragment};

/// One scripted completion.
pub enum Reply {
    Deltas(Vec<ChatDelta>),
    Fail(AgentError),
}

/// Transport that replays queued completions and records every request.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, reply: Reply) -> &Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn push_deltas(&self, deltas: Vec<ChatDelta>) -> &Self {
        self.push(Reply::Deltas(deltas))
    }

    /// A complete tool call, with arguments split into small chunks.
    pub fn push_tool_call(&self, id: &str, name: &str, arguments: Value) -> &Self {
        self.push_deltas(tool_call_deltas(id, name, &arguments))
    }

    pub fn push_reasoning(&self, iteration: usize, remaining: &[&str]) -> &Self {
        self.push_tool_call(
            &format!("r{iteration}"),
            "reasoningtool",
            reasoning_args(remaining),
        )
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelTransport for ScriptedTransport {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn stream_chat(&self, request: ChatRequest) -> Result<DeltaStream, AgentError> {
        self.requests.lock().unwrap().push(request);
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Deltas(deltas)) => Ok(Box::pin(stream::iter(deltas.into_iter().map(Ok)))),
            Some(Reply::Fail(err)) => Err(err),
            None => Err(AgentError::Stream("script exhausted".into())),
        }
    }
}

pub fn tool_call_deltas(id: &str, name: &str, arguments: &Value) -> Vec<ChatDelta> {
    let text = arguments.to_string();
    let chars: Vec<char> = text.chars().collect();
    let mut deltas = vec![ChatDelta::tool(ToolCallFragment::start(0, id, name))];
    for chunk in chars.chunks(7) {
        deltas.push(ChatDelta::tool(ToolCallFragment::args(
            0,
            chunk.iter().collect::<String>(),
        )));
    }
    deltas
}

pub fn reasoning_args(remaining: &[&str]) -> Value {
    json!({
        "reasoning_steps": ["look at the task"],
        "current_situation": "working",
        "plan_status": "in progress",
        "enough_data": true,
        "remaining_steps": remaining,
        "task_completed": remaining.is_empty(),
    })
}

pub fn final_answer_args(answer: &str) -> Value {
    json!({
        "reasoning": "done",
        "completed_steps": ["everything"],
        "answer": answer,
        "status": "completed",
    })
}

pub fn clarification_args(question: &str) -> Value {
    json!({
        "reasoning": "ambiguous",
        "unclear_terms": [],
        "assumptions": [],
        "questions": [question],
    })
}
