//! Vampi: a streaming reasoning + action coding agent engine.
//!
//! Each iteration forces the model to reason through `reasoningtool`, then
//! lets it pick exactly one action tool, executes it, and feeds the result
//! back. Tool-call JSON is reassembled token by token, decoded progress is
//! fanned out to any number of readers, and the conversation is kept within
//! a message budget without splitting tool call/result pairs.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use vampi::prelude::*;
//! use vampi::provider::openai::OpenAiChatTransport;
//!
//! # async fn example() -> vampi::error::Result<()> {
//! let settings = AgentSettings::load(None)?;
//! let transport = Arc::new(OpenAiChatTransport::new(
//!     settings.api_key()?,
//!     settings.openai.base_url.clone(),
//! ));
//! let agent = AgentLoop::new(transport, settings.loop_config("."), "Add a README");
//! let session = SessionHandle::spawn(agent);
//! let outcome = session.wait().await?;
//! println!("{:?}", outcome.final_answer);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod prelude;
pub mod provider;
pub mod stream;
pub mod tools;
pub mod types;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
