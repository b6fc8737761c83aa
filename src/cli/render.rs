//! Terminal rendering of session output.

use std::collections::HashMap;
use std::io::{self, Write};

use serde_json::Value;

use crate::stream::OutputSubscriber;
use crate::tools::ToolName;
use crate::types::StreamEvent;

/// Writes stream events to a terminal-like sink.
pub struct Renderer<W: Write> {
    out: W,
    debug: bool,
    headers: HashMap<String, String>,
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W, debug: bool) -> Self {
        Self {
            out,
            debug,
            headers: HashMap::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn handle(&mut self, event: &StreamEvent) -> io::Result<()> {
        match event {
            StreamEvent::RawText { text } => write!(self.out, "{text}")?,
            StreamEvent::ToolHeader { id, name } => {
                self.headers.insert(id.clone(), name.clone());
                writeln!(self.out, "\n---- {name} ----")?;
            }
            StreamEvent::ToolProgress { id, partial } => {
                if self.debug {
                    let name = self.headers.get(id).map(String::as_str).unwrap_or("?");
                    let len = partial.as_ref().map(|p| p.to_string().len()).unwrap_or(0);
                    writeln!(self.out, "[{name}] {len} chars decoded")?;
                }
            }
            StreamEvent::ToolFinalized {
                name, arguments, ..
            } => self.render_finalized(name, arguments)?,
            StreamEvent::Done => writeln!(self.out)?,
        }
        self.out.flush()
    }

    fn render_finalized(&mut self, name: &str, arguments: &Value) -> io::Result<()> {
        match name.parse::<ToolName>() {
            Ok(ToolName::ClarificationTool) => {
                writeln!(self.out, "Questions:")?;
                let questions = arguments["questions"].as_array().cloned().unwrap_or_default();
                for (i, question) in questions.iter().enumerate() {
                    writeln!(self.out, "  {}. {}", i + 1, question.as_str().unwrap_or_default())?;
                }
            }
            _ => {
                let pretty = serde_json::to_string_pretty(arguments)
                    .unwrap_or_else(|_| arguments.to_string());
                writeln!(self.out, "{pretty}")?;
            }
        }
        Ok(())
    }

    /// Render until the stream ends.
    pub async fn drain(&mut self, mut subscriber: OutputSubscriber) -> io::Result<()> {
        while let Some(event) = subscriber.next().await {
            self.handle(&event)?;
        }
        Ok(())
    }
}
