//! Conversation history with bounded, pair-preserving truncation.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::types::{Message, Role};

/// Bounds applied before every model request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TruncationPolicy {
    /// Maximum number of messages sent to the model.
    pub max_messages: usize,
    /// Most recent messages that are always kept.
    pub recent_window: usize,
}

impl Default for TruncationPolicy {
    fn default() -> Self {
        Self {
            max_messages: 80,
            recent_window: 20,
        }
    }
}

/// What a truncation pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TruncationOutcome {
    Unchanged,
    Truncated { before: usize, after: usize },
    /// System messages and the recent window alone filled the budget; every
    /// older tool pair was dropped.
    Aggressive { before: usize, after: usize },
}

/// Ordered message log for one session.
#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    messages: Vec<Message>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    /// Shrink the log to the policy budget.
    ///
    /// System messages and the last `recent_window` messages always survive.
    /// Older assistant tool calls survive together with their results or not
    /// at all, newest first while they fit. Older plain text is dropped.
    /// Surviving messages keep their relative order.
    pub fn truncate(&mut self, policy: &TruncationPolicy) -> TruncationOutcome {
        let before = self.messages.len();
        if before <= policy.max_messages {
            return TruncationOutcome::Unchanged;
        }

        let mut recent_start = before.saturating_sub(policy.recent_window);
        // A result at the window edge pulls its call (and siblings) in with it.
        while recent_start > 0
            && recent_start < before
            && self.messages[recent_start].role == Role::Tool
        {
            recent_start -= 1;
        }

        let mut system = Vec::new();
        let mut groups: Vec<(usize, usize)> = Vec::new();
        let mut i = 0;
        while i < recent_start {
            let msg = &self.messages[i];
            if msg.role == Role::System {
                system.push(i);
                i += 1;
                continue;
            }
            if msg.has_tool_calls() {
                let mut end = i + 1;
                while end < recent_start && self.messages[end].answers(&msg.tool_calls) {
                    end += 1;
                }
                if end > i + 1 {
                    groups.push((i, end));
                }
                i = end;
                continue;
            }
            i += 1;
        }

        let recent_len = before - recent_start;
        let essential = system.len() + recent_len;
        let mut keep = vec![false; before];
        for &idx in &system {
            keep[idx] = true;
        }
        keep[recent_start..].iter_mut().for_each(|k| *k = true);

        let aggressive = essential >= policy.max_messages;
        if !aggressive {
            let mut available = policy.max_messages - essential;
            for &(start, end) in groups.iter().rev() {
                let size = end - start;
                if size > available {
                    break;
                }
                available -= size;
                keep[start..end].iter_mut().for_each(|k| *k = true);
            }
        }

        let mut flags = keep.into_iter();
        self.messages.retain(|_| flags.next().unwrap_or(false));
        let after = self.messages.len();

        if aggressive {
            warn!(
                before,
                after, "history truncation aggressive: only system and recent messages kept"
            );
            TruncationOutcome::Aggressive { before, after }
        } else {
            info!(before, after, "history truncated");
            TruncationOutcome::Truncated { before, after }
        }
    }
}
