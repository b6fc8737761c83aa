//! Reassembles streamed tool calls and detects when each one is complete.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, trace};

use crate::error::AgentError;
use crate::types::{ChatDelta, StreamEvent, ToolCallFragment};

use super::partial::parse_partial_json;

/// One tool call under reconstruction.
#[derive(Debug, Clone, PartialEq)]
pub struct AccumulatedCall {
    pub id: String,
    pub name: String,
    /// Raw argument text as received.
    pub arguments: String,
    /// Parsed arguments; set exactly once, when the call is sealed.
    pub parsed: Option<Value>,
    synthetic_id: bool,
}

impl AccumulatedCall {
    pub fn is_sealed(&self) -> bool {
        self.parsed.is_some()
    }
}

/// Everything collected from one model response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccumulatedResponse {
    pub text: String,
    /// Calls in first-seen order.
    pub calls: Vec<AccumulatedCall>,
}

impl AccumulatedResponse {
    pub fn sealed_calls(&self) -> impl Iterator<Item = &AccumulatedCall> {
        self.calls.iter().filter(|c| c.is_sealed())
    }

    pub fn has_unsealed(&self) -> bool {
        self.calls.iter().any(|c| !c.is_sealed())
    }
}

/// Per-response accumulator turning deltas into [`StreamEvent`]s.
///
/// Calls are keyed by id. Fragments without an id are routed by their
/// position; a position never seen with an id gets the synthetic key
/// `idx_{index}` until a real id shows up for it.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    text: String,
    calls: Vec<AccumulatedCall>,
    by_key: HashMap<String, usize>,
    by_index: HashMap<usize, usize>,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one delta; returns the events it produced, in order.
    pub fn apply(&mut self, delta: ChatDelta) -> Result<Vec<StreamEvent>, AgentError> {
        let mut events = Vec::new();
        if let Some(text) = delta.content.as_deref() {
            events.extend(self.on_content(text));
        }
        for fragment in delta.tool_calls {
            events.extend(self.on_tool_fragment(fragment)?);
        }
        Ok(events)
    }

    /// Append plain text. Blank fragments and fragments that look like the
    /// start or end of a JSON payload are kept in the buffer but not
    /// displayed.
    pub fn on_content(&mut self, text: &str) -> Option<StreamEvent> {
        self.text.push_str(text);
        let trimmed = text.trim_start();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.starts_with('{') || trimmed.starts_with('}') {
            trace!("suppressing structural text fragment");
            return None;
        }
        Some(StreamEvent::RawText {
            text: text.to_string(),
        })
    }

    pub fn on_tool_fragment(
        &mut self,
        fragment: ToolCallFragment,
    ) -> Result<Vec<StreamEvent>, AgentError> {
        let slot = self.slot_for(&fragment);
        let mut events = Vec::new();

        if self.calls[slot].is_sealed() {
            if fragment.name.is_some() || fragment.arguments.is_some() {
                debug!(id = %self.calls[slot].id, "ignoring fragment for sealed tool call");
            }
            return Ok(events);
        }

        let call = &mut self.calls[slot];
        if let Some(name) = fragment.name.as_deref().filter(|n| !n.is_empty()) {
            let was_empty = call.name.is_empty();
            call.name.push_str(name);
            if was_empty {
                events.push(StreamEvent::ToolHeader {
                    id: call.id.clone(),
                    name: call.name.clone(),
                });
            }
        }

        if let Some(args) = fragment.arguments.as_deref().filter(|a| !a.is_empty()) {
            call.arguments.push_str(args);
            match serde_json::from_str::<Value>(&call.arguments) {
                Ok(value) => events.push(self.seal(slot, value)?),
                Err(_) => events.push(StreamEvent::ToolProgress {
                    id: call.id.clone(),
                    partial: parse_partial_json(&call.arguments),
                }),
            }
        }

        Ok(events)
    }

    /// Re-check every unsealed call. Calls already sealed produce nothing,
    /// so calling this repeatedly is harmless.
    pub fn finalize_pending(&mut self) -> Result<Vec<StreamEvent>, AgentError> {
        let mut events = Vec::new();
        for slot in 0..self.calls.len() {
            if self.calls[slot].is_sealed() {
                continue;
            }
            if let Ok(value) = serde_json::from_str::<Value>(&self.calls[slot].arguments) {
                events.push(self.seal(slot, value)?);
            }
        }
        Ok(events)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn calls(&self) -> &[AccumulatedCall] {
        &self.calls
    }

    pub fn finish(self) -> AccumulatedResponse {
        AccumulatedResponse {
            text: self.text,
            calls: self.calls,
        }
    }

    fn seal(&mut self, slot: usize, value: Value) -> Result<StreamEvent, AgentError> {
        let call = &mut self.calls[slot];
        if call.name.is_empty() {
            return Err(AgentError::protocol(format!(
                "tool call {} completed without a name",
                call.id
            )));
        }
        call.parsed = Some(value.clone());
        debug!(id = %call.id, name = %call.name, "tool call sealed");
        Ok(StreamEvent::ToolFinalized {
            id: call.id.clone(),
            name: call.name.clone(),
            arguments: value,
        })
    }

    fn slot_for(&mut self, fragment: &ToolCallFragment) -> usize {
        if let Some(id) = fragment.id.as_deref() {
            if let Some(&slot) = self.by_key.get(id) {
                return slot;
            }
            // Adopt the real id for a call opened under a synthetic key.
            if let Some(&slot) = self.by_index.get(&fragment.index) {
                let call = &mut self.calls[slot];
                if call.synthetic_id && !call.is_sealed() {
                    self.by_key.remove(&call.id);
                    call.id = id.to_string();
                    call.synthetic_id = false;
                    self.by_key.insert(id.to_string(), slot);
                    return slot;
                }
            }
            return self.open(id.to_string(), fragment.index, false);
        }

        if let Some(&slot) = self.by_index.get(&fragment.index) {
            return slot;
        }
        self.open(format!("idx_{}", fragment.index), fragment.index, true)
    }

    fn open(&mut self, id: String, index: usize, synthetic_id: bool) -> usize {
        let slot = self.calls.len();
        self.calls.push(AccumulatedCall {
            id: id.clone(),
            name: String::new(),
            arguments: String::new(),
            parsed: None,
            synthetic_id,
        });
        self.by_key.insert(id, slot);
        self.by_index.insert(index, slot);
        slot
    }
}
