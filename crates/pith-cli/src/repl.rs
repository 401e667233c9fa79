//! Interactive loop: read a submission, run the turn, render the reply

use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;
use pith_agent::{
    AgentEvent, Conversation, Error as AgentError, Orchestrator, ProviderGateway, TurnOutcome,
};
use pith_ai::Model;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::commands::{CommandResult, execute_command};
use crate::display::{self, Display};
use crate::input::{self, Submission};
use crate::segment::segment;

/// Shown when the gateway fails for the current turn
pub const APOLOGY: &str = "Sorry, I couldn't process that request.";

/// What the user sees for one turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Rendered through the segmenter
    Answer(String),
    /// Shown as a status line
    Notice(String),
}

/// Append the user's text, orchestrate, persist only a real answer, trim
pub async fn run_turn(
    orchestrator: &Orchestrator,
    conversation: &mut Conversation,
    input: &str,
    cancel: CancellationToken,
) -> TurnOutcome {
    conversation.append_user(input);
    let outcome = orchestrator.run(conversation.messages(), cancel).await;
    if let Some(answer) = outcome.answer() {
        conversation.append_assistant(answer);
    }
    conversation.trim();
    outcome
}

pub fn reply_for(outcome: &TurnOutcome) -> Reply {
    match outcome {
        TurnOutcome::Answered(text) => Reply::Answer(text.clone()),
        TurnOutcome::Exhausted { message, .. } => Reply::Notice(message.clone()),
        TurnOutcome::Failed(AgentError::Cancelled) => Reply::Notice("Request cancelled.".into()),
        TurnOutcome::Failed(_) => Reply::Notice(APOLOGY.into()),
    }
}

/// Apply a configured base URL override
pub fn with_base_url(mut model: Model, base_url: Option<&str>) -> Model {
    if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
        model.base_url = url.trim_end_matches('/').to_string();
    }
    model
}

/// Ctrl-C cancels the running turn, or exits when idle
fn spawn_interrupt_watcher(active: Arc<Mutex<Option<CancellationToken>>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            match active.lock().as_ref() {
                Some(token) => {
                    tracing::info!("interrupt received, cancelling turn");
                    token.cancel();
                }
                None => {
                    tracing::info!("interrupt received while idle, exiting");
                    println!();
                    std::process::exit(130);
                }
            }
        }
    })
}

/// Prints a line for each tool call as it starts
fn spawn_event_printer(mut rx: broadcast::Receiver<AgentEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(AgentEvent::ToolExecutionStart {
                    tool_name,
                    arguments,
                    ..
                }) => {
                    let _ = display::tool_activity(
                        &format!("[running {} {}]", tool_name, arguments),
                        &mut io::stdout(),
                    );
                }
                Ok(AgentEvent::ToolExecutionEnd {
                    tool_name,
                    summary,
                    is_error: true,
                    ..
                }) => {
                    let _ = display::tool_activity(
                        &format!("[{} failed: {}]", tool_name, summary),
                        &mut io::stdout(),
                    );
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// One interactive session over stdin/stdout
pub struct Session {
    orchestrator: Orchestrator,
    gateway: Arc<ProviderGateway>,
    conversation: Conversation,
    models: Vec<Model>,
    base_url: Option<String>,
    display: Display,
    active_turn: Arc<Mutex<Option<CancellationToken>>>,
}

impl Session {
    pub fn new(
        orchestrator: Orchestrator,
        gateway: Arc<ProviderGateway>,
        conversation: Conversation,
        models: Vec<Model>,
        base_url: Option<String>,
    ) -> Self {
        Self {
            orchestrator,
            gateway,
            conversation,
            models,
            base_url,
            display: Display::new(),
            active_turn: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        let watcher = spawn_interrupt_watcher(Arc::clone(&self.active_turn));
        let printer = spawn_event_printer(self.orchestrator.subscribe());

        let mut submissions = input::spawn_stdin_reader();
        let mut stdout = io::stdout();

        loop {
            self.display.prompt(&mut stdout)?;

            let submission = submissions.recv().await.transpose()?;
            match submission.unwrap_or(Submission::Empty) {
                Submission::Empty => {
                    self.display.notice("No input provided. Exiting.", &mut stdout)?;
                    break;
                }
                Submission::Clear => {
                    tracing::debug!("Message log before clear:\n{}", self.conversation.dump());
                    self.conversation.clear();
                    self.display.clear_screen(&mut stdout)?;
                    tracing::info!("history cleared");
                }
                Submission::Command(line) => self.handle_command(&line, &mut stdout)?,
                Submission::Message(text) => {
                    self.display.notice("\nSending your message(s).\n", &mut stdout)?;
                    let reply = self.turn(&text).await;
                    self.show(&reply, &mut stdout)?;
                }
            }
        }

        printer.abort();
        watcher.abort();
        Ok(())
    }

    async fn turn(&mut self, text: &str) -> Reply {
        let cancel = CancellationToken::new();
        *self.active_turn.lock() = Some(cancel.clone());
        let outcome = run_turn(&self.orchestrator, &mut self.conversation, text, cancel).await;
        *self.active_turn.lock() = None;

        tracing::info!(
            answered = outcome.is_answered(),
            history_len = self.conversation.len(),
            "turn finished"
        );
        if let TurnOutcome::Failed(e) = &outcome {
            if e.is_gateway() {
                eprintln!("Error: {}", e);
            }
        }
        reply_for(&outcome)
    }

    fn show(&self, reply: &Reply, out: &mut impl Write) -> io::Result<()> {
        match reply {
            Reply::Answer(text) => self.display.render(&segment(text), out),
            Reply::Notice(message) => self.display.notice(message, out),
        }
    }

    fn handle_command(&mut self, line: &str, out: &mut impl Write) -> io::Result<()> {
        let current = self.gateway.model();
        match execute_command(line, &current, &self.models) {
            CommandResult::ChangeModel(model) => {
                let model = with_base_url(model, self.base_url.as_deref());
                let message = format!("Switched to: {} ({})", model.id, model.provider.name());
                self.gateway.set_model(model);
                self.display.notice(&message, out)
            }
            CommandResult::Message(message) => writeln!(out, "{}", message),
            CommandResult::Unknown(cmd) => self.display.notice(
                &format!("Unknown command: /{}\nType /help for available commands.", cmd),
                out,
            ),
        }
    }
}
