//! The two-phase reasoning/action loop.

use std::path::PathBuf;
use std::sync::Arc;

use bon::Builder;
use futures::StreamExt;
use serde_json::{json, Value};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::AgentError;
use crate::provider::{ChatRequest, ModelTransport};
use crate::stream::{AccumulatedResponse, OutputStream, StreamAccumulator};
use crate::tools::{AgentAction, FinalAnswerTool, ReasoningTool, ToolName, ToolRegistry};
use crate::types::{GenerationSettings, Message, StreamEvent, ToolCallRequest, ToolChoice};
use crate::util::truncate_chars;

use super::context::{AgentContext, AgentState, ClarificationSender};
use super::conversation::{ConversationStore, TruncationPolicy};
use super::log::{ExecutionLog, StepType};
use super::prompts::{initial_request, system_prompt};
use super::session::SessionOutcome;

/// Static configuration for one session.
#[derive(Debug, Clone, Builder)]
pub struct AgentLoopConfig {
    #[builder(into)]
    pub model: String,
    #[builder(default)]
    pub settings: GenerationSettings,
    #[builder(into, default = PathBuf::from("."))]
    pub workspace: PathBuf,
    /// Enabled tools. Reasoning and final answer are always added.
    #[builder(default = ToolName::all())]
    pub toolkit: Vec<ToolName>,
    #[builder(default = 5)]
    pub max_clarifications: usize,
    #[builder(default)]
    pub truncation: TruncationPolicy,
    /// Characters of each tool result echoed to the output stream.
    #[builder(default = 2000)]
    pub result_preview_chars: usize,
    /// Where the execution log is written. Nothing is written when unset.
    #[builder(into)]
    pub logs_dir: Option<PathBuf>,
    /// Replaces the generated system prompt.
    #[builder(into)]
    pub system_prompt: Option<String>,
}

/// One agent session: owns the conversation, the context and the output.
pub struct AgentLoop {
    session_id: String,
    transport: Arc<dyn ModelTransport>,
    config: AgentLoopConfig,
    task: String,
    registry: ToolRegistry,
    context: AgentContext,
    conversation: ConversationStore,
    log: ExecutionLog,
    output: OutputStream,
    cancel: CancellationToken,
    final_answer: Option<String>,
}

impl AgentLoop {
    pub fn new(
        transport: Arc<dyn ModelTransport>,
        config: AgentLoopConfig,
        task: impl Into<String>,
    ) -> Self {
        let session_id = Uuid::new_v4().to_string();
        let task = task.into();
        let registry = ToolRegistry::new(config.toolkit.iter().copied(), config.max_clarifications);
        let context = AgentContext::new(config.workspace.clone());
        Self {
            log: ExecutionLog::new(&session_id, &task),
            session_id,
            transport,
            config,
            task,
            registry,
            context,
            conversation: ConversationStore::new(),
            output: OutputStream::new(),
            cancel: CancellationToken::new(),
            final_answer: None,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn output(&self) -> OutputStream {
        self.output.clone()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<AgentState> {
        self.context.watch_state()
    }

    pub fn clarification_sender(&self) -> ClarificationSender {
        self.context.clarification_sender()
    }

    /// Drive the session to a terminal state.
    ///
    /// The output stream is finished and the log persisted on every path.
    /// A panic inside the loop still finishes the stream.
    pub async fn run(mut self) -> SessionOutcome {
        let _finish = self.output.finish_guard();
        info!(session_id = %self.session_id, transport = self.transport.name(), task = %self.task, "starting agent session");

        let result = self.execute().await;
        let error = match result {
            Ok(()) => None,
            Err(err) => {
                error!(session_id = %self.session_id, error = %err, "agent session failed");
                self.context.set_state(AgentState::Failed);
                self.log.record(
                    self.context.iteration,
                    StepType::Failure,
                    json!({
                        "error": err.to_string(),
                        "category": format!("{:?}", err.category()),
                    }),
                );
                Some(err.to_string())
            }
        };

        self.output.finish();

        let log_path = match &self.config.logs_dir {
            Some(dir) => match self
                .log
                .persist(
                    dir,
                    self.context.state(),
                    self.context.iteration,
                    self.context.clarifications_used,
                )
                .await
            {
                Ok(path) => Some(path),
                Err(err) => {
                    warn!(error = %err, "failed to write execution log");
                    None
                }
            },
            None => None,
        };

        info!(
            session_id = %self.session_id,
            state = %self.context.state(),
            iterations = self.context.iteration,
            "agent session finished"
        );

        SessionOutcome {
            session_id: self.session_id,
            state: self.context.state(),
            iterations: self.context.iteration,
            error,
            final_answer: self.final_answer,
            messages: self.conversation.into_messages(),
            log_path,
        }
    }

    async fn execute(&mut self) -> Result<(), AgentError> {
        self.conversation.push(Message::user(initial_request(&self.task)));

        while !self.context.state().is_terminal() {
            self.ensure_active()?;
            self.context.iteration += 1;
            info!(iteration = self.context.iteration, "iteration");

            self.conversation.truncate(&self.config.truncation);

            let reasoning = self.reasoning_phase().await?;
            let action = self.select_action_phase(&reasoning).await?;
            self.ensure_active()?;
            self.action_phase(&action).await?;

            if matches!(action, AgentAction::Clarification(_)) && !self.context.state().is_terminal()
            {
                self.await_clarification().await?;
            }
        }
        Ok(())
    }

    fn ensure_active(&self) -> Result<(), AgentError> {
        if self.cancel.is_cancelled() {
            return Err(AgentError::Canceled);
        }
        Ok(())
    }

    fn request(&self, tool_choice: ToolChoice) -> ChatRequest {
        let offered = self.registry.offered(&self.context);
        let system = self
            .config
            .system_prompt
            .clone()
            .unwrap_or_else(|| system_prompt(&offered, self.context.workspace()));

        let mut messages = Vec::with_capacity(self.conversation.len() + 1);
        messages.push(Message::system(system));
        messages.extend(self.conversation.messages().iter().cloned());

        ChatRequest {
            model: self.config.model.clone(),
            messages,
            tools: offered.into_iter().map(ToolName::definition).collect(),
            tool_choice,
            settings: self.config.settings.clone(),
        }
    }

    /// Stream one completion through the accumulator into the output.
    async fn stream_completion(
        &mut self,
        request: ChatRequest,
    ) -> Result<AccumulatedResponse, AgentError> {
        let cancel = self.cancel.clone();
        let mut stream = tokio::select! {
            _ = cancel.cancelled() => return Err(AgentError::Canceled),
            stream = self.transport.stream_chat(request) => stream?,
        };

        let mut accumulator = StreamAccumulator::new();
        loop {
            tokio::select! {
                // Dropping the stream closes the connection.
                _ = cancel.cancelled() => return Err(AgentError::Canceled),
                delta = stream.next() => {
                    let Some(delta) = delta else { break; };
                    let events = accumulator.apply(delta?)?;
                    self.output.publish_all(events);
                }
            }
        }
        let events = accumulator.finalize_pending()?;
        self.output.publish_all(events);

        let response = accumulator.finish();
        debug!(
            text_len = response.text.len(),
            calls = response.calls.len(),
            "completion finished"
        );
        Ok(response)
    }

    async fn reasoning_phase(&mut self) -> Result<ReasoningTool, AgentError> {
        let iteration = self.context.iteration;
        let request = self.request(ToolChoice::forced(ToolName::ReasoningTool.as_str()));
        let response = self.stream_completion(request).await?;

        let call = response
            .sealed_calls()
            .find(|c| c.name == ToolName::ReasoningTool.as_str())
            .ok_or_else(|| AgentError::protocol("reasoning phase returned no reasoningtool call"))?;
        let arguments = call.parsed.clone().unwrap_or(Value::Null);
        let action = self.registry.parse(&call.name, &arguments)?;
        let AgentAction::Reasoning(reasoning) = action.clone() else {
            return Err(AgentError::protocol("reasoning phase parsed into another tool"));
        };

        let id = format!("{iteration}-reasoning");
        self.conversation.push(Message::assistant_tool_calls(
            None,
            vec![ToolCallRequest::new(
                &id,
                ToolName::ReasoningTool.as_str(),
                action.arguments_json()?,
            )],
        ));
        let result = action.invoke(&mut self.context).await?;
        self.conversation.push(Message::tool_result(&id, result));

        info!(
            iteration,
            situation = %truncate_chars(&reasoning.current_situation, 200),
            plan = %truncate_chars(&reasoning.plan_status, 200),
            enough_data = reasoning.enough_data,
            remaining = reasoning.remaining_steps.len(),
            task_completed = reasoning.task_completed,
            next_step = reasoning.next_step().unwrap_or("Completing"),
            clarifications = self.context.clarifications_used,
            "agent reasoning"
        );
        self.log
            .record(iteration, StepType::Reasoning, serde_json::to_value(&reasoning)?);
        Ok(reasoning)
    }

    async fn select_action_phase(
        &mut self,
        reasoning: &ReasoningTool,
    ) -> Result<AgentAction, AgentError> {
        let iteration = self.context.iteration;
        let response = self.stream_completion(self.request(ToolChoice::Required)).await?;

        let id = format!("{iteration}-action");
        let action = match response.sealed_calls().next() {
            Some(call) => {
                let arguments = call.parsed.clone().unwrap_or(Value::Null);
                self.registry.parse(&call.name, &arguments)?
            }
            None if response.has_unsealed() => {
                return Err(AgentError::protocol(
                    "action call arguments never became valid JSON",
                ));
            }
            None => {
                debug!("plain-text completion treated as final answer");
                let action = AgentAction::FinalAnswer(FinalAnswerTool::from_text(&response.text));
                self.output.publish(StreamEvent::ToolHeader {
                    id: id.clone(),
                    name: action.name().to_string(),
                });
                self.output.publish(StreamEvent::ToolFinalized {
                    id: id.clone(),
                    name: action.name().to_string(),
                    arguments: serde_json::from_str(&action.arguments_json()?)?,
                });
                action
            }
        };

        self.conversation.push(Message::assistant_tool_calls(
            Some(reasoning.next_step().unwrap_or("Processing").to_string()),
            vec![ToolCallRequest::new(
                &id,
                action.name().as_str(),
                action.arguments_json()?,
            )],
        ));
        Ok(action)
    }

    async fn action_phase(&mut self, action: &AgentAction) -> Result<(), AgentError> {
        let iteration = self.context.iteration;
        let id = format!("{iteration}-action");
        let name = action.name();

        let result = match action.invoke(&mut self.context).await {
            Ok(text) => text,
            Err(err) => {
                warn!(tool = %name, error = %err, "tool execution failed");
                format!("Error executing {name}: {err}")
            }
        };
        self.conversation.push(Message::tool_result(&id, result.clone()));

        let preview = truncate_chars(&result, self.config.result_preview_chars);
        self.output.publish(StreamEvent::RawText {
            text: format!("\nResult:\n{preview}\n"),
        });

        if let AgentAction::FinalAnswer(answer) = action {
            self.final_answer = Some(answer.answer.clone());
        }

        self.log.record(
            iteration,
            StepType::ToolExecution,
            json!({
                "tool": name.to_string(),
                "arguments": serde_json::from_str::<Value>(&action.arguments_json()?)?,
                "result": result,
            }),
        );
        Ok(())
    }

    async fn await_clarification(&mut self) -> Result<(), AgentError> {
        let stale = self.context.clarification_signal().reset();
        if stale > 0 {
            debug!(stale, "discarded clarification answers sent before the pause");
        }
        self.context.set_state(AgentState::WaitingForClarification);
        info!(iteration = self.context.iteration, "paused for clarification");

        let cancel = self.cancel.clone();
        let answer = tokio::select! {
            _ = cancel.cancelled() => return Err(AgentError::Canceled),
            answer = self.context.clarification_signal().wait() => answer
                .ok_or_else(|| AgentError::InvalidState("clarification channel closed".into()))?,
        };

        self.conversation.push(Message::user(answer));
        self.context.set_state(AgentState::Running);
        info!("clarification received, resuming");
        Ok(())
    }
}
