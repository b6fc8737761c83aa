//! Deadline helper.

use std::future::Future;
use std::time::Duration;

use crate::error::AgentError;

/// Wrap a fallible future with a deadline.
///
/// The engine imposes no timeouts of its own; callers that want a deadline
/// around a tool invocation or a whole session wrap it with this.
pub async fn with_timeout<T>(
    duration: Duration,
    future: impl Future<Output = Result<T, AgentError>>,
) -> Result<T, AgentError> {
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(AgentError::Timeout(duration.as_millis() as u64)),
    }
}
