//! Error types for vampi.

use thiserror::Error;

/// Primary error type for all agent operations.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limited: retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Stream error: {0}")]
    Stream(String),

    /// The model answered outside the contract of the phase that asked it.
    #[error("Protocol violation: {0}")]
    Protocol(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("Tool execution error: {tool_name}: {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Session canceled")]
    Canceled,
}

/// Coarse classification of an [`AgentError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The model endpoint could not be reached or answered with an error.
    Transport,
    /// The model produced output that breaks the phase contract.
    Protocol,
    /// A tool failed; surfaced to the model as the tool result.
    Tool,
    Configuration,
    Internal,
}

impl AgentError {
    /// Create an API error from a status code and response body.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a protocol violation error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Create a tool execution error.
    pub fn tool(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolExecution {
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Api { .. }
            | Self::Network(_)
            | Self::Authentication(_)
            | Self::RateLimited { .. }
            | Self::Timeout(_)
            | Self::Stream(_) => ErrorCategory::Transport,
            Self::Protocol(_) | Self::UnknownTool(_) | Self::InvalidArguments { .. } => {
                ErrorCategory::Protocol
            }
            Self::ToolExecution { .. } => ErrorCategory::Tool,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Io(_) | Self::Serialization(_) | Self::InvalidState(_) | Self::Canceled => {
                ErrorCategory::Internal
            }
        }
    }

    /// Whether a caller wrapping a whole session may reasonably retry it.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Network(_) | Self::Timeout(_) => true,
            Self::Api { status, .. } => (500..=599).contains(status),
            _ => false,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, AgentError>;
