//! Command-line front end.

pub mod render;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tracing::info;

use crate::agent::{AgentLoop, AgentState, SessionHandle, SessionOutcome};
use crate::config::AgentSettings;
use crate::error::AgentError;
use crate::provider::openai::OpenAiChatTransport;
use crate::provider::ModelTransport;

use render::Renderer;

/// Vampi coding agent
#[derive(Parser, Debug)]
#[command(name = "vampi", version, about = "Streaming reasoning + action coding agent")]
pub struct Cli {
    /// Workspace the agent may read and modify (defaults to the current directory)
    #[arg(short, long, global = true)]
    pub workspace: Option<PathBuf>,

    /// Model override
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Path to a vampi.toml configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose logging and tool-progress output
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive loop: one session per request
    Chat,
    /// Run a single task and exit
    Task(TaskArgs),
}

#[derive(Parser, Debug)]
pub struct TaskArgs {
    /// Task description
    #[arg(required = true, num_args = 1..)]
    pub prompt: Vec<String>,
}

type InputLines = Lines<BufReader<Stdin>>;

/// Shared state for every session started from the command line.
pub struct App {
    settings: AgentSettings,
    transport: Arc<dyn ModelTransport>,
    workspace: PathBuf,
    debug: bool,
    input: InputLines,
}

impl App {
    pub fn from_cli(cli: &Cli) -> Result<Self, AgentError> {
        let mut settings = AgentSettings::load(cli.config.as_deref())?;
        if let Some(model) = &cli.model {
            settings.openai.model = model.clone();
        }
        let transport = Arc::new(OpenAiChatTransport::new(
            settings.api_key()?,
            settings.openai.base_url.clone(),
        ));
        let workspace = match &cli.workspace {
            Some(path) => path.clone(),
            None => std::env::current_dir()?,
        };
        let workspace = std::fs::canonicalize(&workspace).map_err(|e| {
            AgentError::Configuration(format!("workspace {}: {e}", workspace.display()))
        })?;
        Ok(Self {
            settings,
            transport,
            workspace,
            debug: cli.debug,
            input: BufReader::new(tokio::io::stdin()).lines(),
        })
    }

    pub async fn run(&mut self, command: &Commands) -> Result<(), AgentError> {
        match command {
            Commands::Task(args) => {
                let outcome = self.run_session(&args.prompt.join(" ")).await?;
                if !outcome.is_success() {
                    return Err(AgentError::InvalidState(
                        outcome.error.unwrap_or_else(|| "task failed".into()),
                    ));
                }
                Ok(())
            }
            Commands::Chat => self.chat().await,
        }
    }

    async fn chat(&mut self) -> Result<(), AgentError> {
        println!(
            "vampi | model {} | workspace {}",
            self.settings.openai.model,
            self.workspace.display()
        );
        println!("Type a request, or /exit to quit.");
        loop {
            let Some(line) = self.prompt("\n> ").await? else {
                return Ok(());
            };
            let line = line.trim();
            match line {
                "" => continue,
                "/exit" | "/quit" => return Ok(()),
                task => {
                    self.run_session(task).await?;
                }
            }
        }
    }

    async fn prompt(&mut self, label: &str) -> Result<Option<String>, AgentError> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(label.as_bytes()).await?;
        stdout.flush().await?;
        Ok(self.input.next_line().await?)
    }

    /// Run one session, rendering its output and answering clarifications
    /// from stdin. Ctrl-C aborts the session.
    async fn run_session(&mut self, task: &str) -> Result<SessionOutcome, AgentError> {
        let config = self.settings.loop_config(&self.workspace);
        let agent = AgentLoop::new(self.transport.clone(), config, task);
        let session = SessionHandle::spawn(agent);
        info!(session_id = session.session_id(), "session started");

        let subscriber = session.subscribe();
        let debug = self.debug;
        let render = tokio::spawn(async move {
            let mut renderer = Renderer::new(std::io::stdout(), debug);
            renderer.drain(subscriber).await
        });

        let mut state_rx = session.watch_state();
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    eprintln!("\nAborting session...");
                    session.abort();
                    break;
                }
                changed = state_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = *state_rx.borrow_and_update();
                    match state {
                        AgentState::WaitingForClarification => {
                            let answer = until_interrupted(
                                self.prompt("\nYour answer: "),
                                tokio::signal::ctrl_c(),
                            )
                            .await;
                            let Some(answer) = answer else {
                                eprintln!("\nAborting session...");
                                session.abort();
                                break;
                            };
                            session.provide_clarification(answer?.unwrap_or_default())?;
                        }
                        s if s.is_terminal() => break,
                        _ => {}
                    }
                }
            }
        }

        let outcome = session.wait().await?;
        render
            .await
            .map_err(|e| AgentError::InvalidState(format!("renderer task failed: {e}")))??;

        match (&outcome.final_answer, &outcome.error) {
            (Some(answer), _) => println!("\n==== Answer ====\n{answer}"),
            (None, Some(error)) => eprintln!("\nSession failed: {error}"),
            (None, None) => {}
        }
        if let Some(path) = &outcome.log_path {
            println!("Log: {}", path.display());
        }
        Ok(outcome)
    }
}

/// Await `work` unless `interrupt` resolves first, in which case `None`.
async fn until_interrupted<T>(
    work: impl std::future::Future<Output = T>,
    interrupt: impl std::future::Future,
) -> Option<T> {
    tokio::select! {
        biased;
        _ = interrupt => None,
        value = work => Some(value),
    }
}
