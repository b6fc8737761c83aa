//! Structured per-session execution log, persisted once at termination.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::AgentError;

use super::context::AgentState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    Reasoning,
    ToolExecution,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub step_number: usize,
    pub timestamp: DateTime<Utc>,
    pub step_type: StepType,
    pub payload: Value,
}

/// Append-only record of what a session did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionLog {
    pub session_id: String,
    pub task: String,
    pub started_at: DateTime<Utc>,
    pub entries: Vec<LogEntry>,
}

/// What gets written to disk.
#[derive(Debug, Serialize)]
struct LogDocument<'a> {
    session_id: &'a str,
    task: &'a str,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    final_state: AgentState,
    iterations: usize,
    clarifications_used: usize,
    entries: &'a [LogEntry],
}

impl ExecutionLog {
    pub fn new(session_id: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            task: task.into(),
            started_at: Utc::now(),
            entries: Vec::new(),
        }
    }

    pub fn record(&mut self, step_number: usize, step_type: StepType, payload: Value) {
        self.entries.push(LogEntry {
            step_number,
            timestamp: Utc::now(),
            step_type,
            payload,
        });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// `{timestamp}-{session_id}-log.json`
    pub fn file_name(&self) -> String {
        format!(
            "{}-{}-log.json",
            self.started_at.format("%Y%m%d-%H%M%S"),
            self.session_id
        )
    }

    /// Write the log as pretty JSON under `dir`, creating it if needed.
    pub async fn persist(
        &self,
        dir: &Path,
        final_state: AgentState,
        iterations: usize,
        clarifications_used: usize,
    ) -> Result<PathBuf, AgentError> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(self.file_name());
        let document = LogDocument {
            session_id: &self.session_id,
            task: &self.task,
            started_at: self.started_at,
            finished_at: Utc::now(),
            final_state,
            iterations,
            clarifications_used,
            entries: &self.entries,
        };
        let body = serde_json::to_string_pretty(&document)?;
        tokio::fs::write(&path, body).await?;
        debug!(path = %path.display(), entries = self.entries.len(), "execution log written");
        Ok(path)
    }
}
