//! Agent engine: context, conversation, the loop and its session handle.

pub mod context;
pub mod conversation;
pub mod log;
pub mod prompts;
pub mod runner;
pub mod session;

pub use context::{AgentContext, AgentState, ClarificationSender, ClarificationSignal};
pub use conversation::{ConversationStore, TruncationOutcome, TruncationPolicy};
pub use log::{ExecutionLog, LogEntry, StepType};
pub use runner::{AgentLoop, AgentLoopConfig};
pub use session::{SessionHandle, SessionOutcome};
