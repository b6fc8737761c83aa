//! Handle for a running agent session.

use std::path::PathBuf;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::AgentError;
use crate::stream::{OutputStream, OutputSubscriber};
use crate::types::Message;

use super::context::{AgentState, ClarificationSender};
use super::runner::AgentLoop;

/// How a session ended.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub session_id: String,
    pub state: AgentState,
    pub iterations: usize,
    /// Failure reason when the session ended on an error.
    pub error: Option<String>,
    pub final_answer: Option<String>,
    /// Conversation as it stood at termination.
    pub messages: Vec<Message>,
    pub log_path: Option<PathBuf>,
}

impl SessionOutcome {
    pub fn is_success(&self) -> bool {
        self.state == AgentState::Completed
    }
}

/// Owner-side handle to an [`AgentLoop`] running on its own task.
pub struct SessionHandle {
    session_id: String,
    state_rx: watch::Receiver<AgentState>,
    clarification: ClarificationSender,
    output: OutputStream,
    cancel: CancellationToken,
    task: JoinHandle<SessionOutcome>,
}

impl SessionHandle {
    /// Start `agent` on the tokio runtime.
    pub fn spawn(agent: AgentLoop) -> Self {
        let session_id = agent.session_id().to_string();
        let state_rx = agent.watch_state();
        let clarification = agent.clarification_sender();
        let output = agent.output();
        let cancel = agent.cancel_token();
        let task = tokio::spawn(agent.run());
        Self {
            session_id,
            state_rx,
            clarification,
            output,
            cancel,
            task,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn state(&self) -> AgentState {
        *self.state_rx.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<AgentState> {
        self.state_rx.clone()
    }

    /// New reader over the session output, replaying from the start.
    pub fn subscribe(&self) -> OutputSubscriber {
        self.output.subscribe()
    }

    /// Answer a pending clarification request and resume the loop.
    pub fn provide_clarification(&self, answer: impl Into<String>) -> Result<(), AgentError> {
        let state = self.state();
        if state != AgentState::WaitingForClarification {
            return Err(AgentError::InvalidState(format!(
                "session is {state}, not waiting for clarification"
            )));
        }
        self.clarification.send(answer)
    }

    /// Cancel the session. The model stream is closed, a tool already
    /// running is allowed to finish, and nothing new is started.
    pub fn abort(&self) {
        debug!(session_id = %self.session_id, "abort requested");
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the session to end.
    pub async fn wait(self) -> Result<SessionOutcome, AgentError> {
        self.task
            .await
            .map_err(|e| AgentError::InvalidState(format!("session task failed: {e}")))
    }
}
