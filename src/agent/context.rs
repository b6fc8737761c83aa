//! Per-session mutable state shared by the loop and the executing tool.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum::Display;
use tokio::sync::{mpsc, watch};

use crate::error::AgentError;

/// Agent lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AgentState {
    Running,
    WaitingForClarification,
    Completed,
    Failed,
}

impl AgentState {
    /// `Completed` and `Failed` end the session.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Single-waiter wake primitive carrying the clarification answer.
///
/// Waiting takes `&mut self`, so only one wait can be outstanding at a time.
#[derive(Debug)]
pub struct ClarificationSignal {
    tx: mpsc::UnboundedSender<String>,
    rx: mpsc::UnboundedReceiver<String>,
}

impl ClarificationSignal {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    /// Discard answers delivered before the current pause began.
    pub fn reset(&mut self) -> usize {
        let mut dropped = 0;
        while self.rx.try_recv().is_ok() {
            dropped += 1;
        }
        dropped
    }

    /// Suspend until an answer is supplied.
    pub async fn wait(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    pub fn sender(&self) -> ClarificationSender {
        ClarificationSender {
            tx: self.tx.clone(),
        }
    }
}

/// External half of the clarification signal.
#[derive(Debug, Clone)]
pub struct ClarificationSender {
    tx: mpsc::UnboundedSender<String>,
}

impl ClarificationSender {
    /// Deliver an answer and release the waiting loop.
    pub fn send(&self, answer: impl Into<String>) -> Result<(), AgentError> {
        self.tx
            .send(answer.into())
            .map_err(|_| AgentError::InvalidState("session has ended".into()))
    }
}

/// Session state owned by one agent loop.
///
/// Tools receive it by `&mut` for the duration of a single invocation.
#[derive(Debug)]
pub struct AgentContext {
    state: AgentState,
    state_tx: watch::Sender<AgentState>,
    /// Current iteration, starting at 1 for the first.
    pub iteration: usize,
    pub clarifications_used: usize,
    workspace: PathBuf,
    clarification: ClarificationSignal,
}

impl AgentContext {
    /// A relative `workspace` is anchored at the current directory.
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        let (state_tx, _) = watch::channel(AgentState::Running);
        Self {
            state: AgentState::Running,
            state_tx,
            iteration: 0,
            clarifications_used: 0,
            workspace: absolute_workspace(workspace.into()),
            clarification: ClarificationSignal::new(),
        }
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    /// Update the state and publish it to watchers.
    pub fn set_state(&mut self, state: AgentState) {
        self.state = state;
        self.state_tx.send_replace(state);
    }

    pub fn watch_state(&self) -> watch::Receiver<AgentState> {
        self.state_tx.subscribe()
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn clarification_sender(&self) -> ClarificationSender {
        self.clarification.sender()
    }

    pub fn clarification_signal(&mut self) -> &mut ClarificationSignal {
        &mut self.clarification
    }

    /// Resolve `path` against the workspace, rejecting paths that escape it.
    pub fn resolve_path(&self, path: &str) -> Result<PathBuf, AgentError> {
        let candidate = Path::new(path);
        let joined = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.workspace.join(candidate)
        };
        let root = normalize(&self.workspace);
        if !root.is_absolute() {
            return Err(AgentError::InvalidState(format!(
                "workspace {} is not an absolute path",
                self.workspace.display()
            )));
        }
        let normalized = normalize(&joined);
        if !normalized.starts_with(&root) {
            return Err(AgentError::InvalidArguments {
                tool: "path".into(),
                message: format!("'{path}' is outside the workspace"),
            });
        }
        Ok(normalized)
    }
}

fn absolute_workspace(workspace: PathBuf) -> PathBuf {
    if workspace.is_absolute() {
        return normalize(&workspace);
    }
    match std::env::current_dir() {
        Ok(cwd) => normalize(&cwd.join(workspace)),
        // Left relative; `resolve_path` refuses to resolve against it.
        Err(_) => workspace,
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
