//! Tool-call orchestrator: the per-turn loop between the model and the tools.
//!
//! Each turn runs against a private working copy of the conversation. The
//! caller's history is only updated (by the caller) once the turn is answered,
//! so a failed turn leaves it untouched.

use std::sync::Arc;

use pith_ai::{Message, ToolCallRequest};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::events::AgentEvent;
use crate::executor::ToolExecutor;
use crate::gateway::{Gateway, GatewayResponse};
use crate::history::verify_tool_pairing;
use crate::tool::ToolResult;

/// Default iteration budget
pub const DEFAULT_MAX_ITERATIONS: u32 = 3;

/// Orchestrator settings
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Tool rounds allowed per turn
    pub max_iterations: u32,
    /// Run one round's tool calls concurrently instead of in request order
    pub parallel_tools: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            parallel_tools: false,
        }
    }
}

/// States of one turn
#[derive(Debug)]
pub enum RoundState {
    AwaitingModel,
    DispatchingTools(Vec<ToolCallRequest>),
    Done(String),
    Failed(Error),
}

impl RoundState {
    fn name(&self) -> &'static str {
        match self {
            RoundState::AwaitingModel => "awaiting_model",
            RoundState::DispatchingTools(_) => "dispatching_tools",
            RoundState::Done(_) => "done",
            RoundState::Failed(_) => "failed",
        }
    }
}

/// How a turn ended
#[derive(Debug)]
pub enum TurnOutcome {
    /// Final answer, to be appended to history
    Answered(String),
    /// The iteration budget ran out; `message` is the fallback shown to the user
    Exhausted { iterations: u32, message: String },
    /// Gateway failure, protocol violation or cancellation
    Failed(Error),
}

impl TurnOutcome {
    /// The answer worth persisting, if any
    pub fn answer(&self) -> Option<&str> {
        match self {
            TurnOutcome::Answered(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_answered(&self) -> bool {
        matches!(self, TurnOutcome::Answered(_))
    }
}

/// Drives the gateway and the tool executor until the model answers or a bound is hit
pub struct Orchestrator {
    gateway: Arc<dyn Gateway>,
    executor: ToolExecutor,
    config: OrchestratorConfig,
    event_tx: broadcast::Sender<AgentEvent>,
}

impl Orchestrator {
    pub fn new(gateway: Arc<dyn Gateway>, executor: ToolExecutor, config: OrchestratorConfig) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            gateway,
            executor,
            config,
            event_tx,
        }
    }

    /// Subscribe to orchestration events
    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.event_tx.subscribe()
    }

    /// Run one turn over `history`, which must already end with the user's message.
    pub async fn run(&self, history: &[Message], cancel: CancellationToken) -> TurnOutcome {
        let catalog = self.executor.registry().catalog();
        let mut working = history.to_vec();
        let mut iterations = 0u32;
        let mut rounds = 0u32;
        let mut state = RoundState::AwaitingModel;

        let outcome = loop {
            tracing::debug!(state = state.name(), iterations, "orchestrator state");
            state = match state {
                RoundState::AwaitingModel => {
                    rounds += 1;
                    self.await_model(&mut working, &catalog, rounds, &cancel).await
                }
                // Budget spent: the request is refused without running its tools
                RoundState::DispatchingTools(_) if iterations >= self.config.max_iterations => {
                    RoundState::Failed(Error::IterationsExhausted(iterations))
                }
                RoundState::DispatchingTools(calls) => {
                    let results = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => None,
                        results = self.dispatch(&calls, &cancel) => Some(results),
                    };
                    match results {
                        None => RoundState::Failed(Error::Cancelled),
                        Some(results) => {
                            working.extend(results);
                            iterations += 1;
                            RoundState::AwaitingModel
                        }
                    }
                }
                RoundState::Done(answer) => break TurnOutcome::Answered(answer),
                RoundState::Failed(Error::IterationsExhausted(n)) => {
                    let message = Error::IterationsExhausted(n).to_string();
                    tracing::warn!(iterations = n, "{}", message);
                    break TurnOutcome::Exhausted {
                        iterations: n,
                        message,
                    };
                }
                RoundState::Failed(Error::Ai(e)) => {
                    tracing::error!(transient = e.is_transient(), "gateway call failed: {}", e);
                    break TurnOutcome::Failed(Error::Ai(e));
                }
                RoundState::Failed(e) => {
                    tracing::error!("turn failed: {}", e);
                    break TurnOutcome::Failed(e);
                }
            };
        };

        let _ = self.event_tx.send(AgentEvent::TurnEnd {
            rounds,
            answered: outcome.is_answered(),
        });
        outcome
    }

    async fn await_model(
        &self,
        working: &mut Vec<Message>,
        catalog: &[pith_ai::Tool],
        round: u32,
        cancel: &CancellationToken,
    ) -> RoundState {
        if cancel.is_cancelled() {
            return RoundState::Failed(Error::Cancelled);
        }
        if let Err(e) = verify_tool_pairing(working) {
            return RoundState::Failed(e);
        }

        let _ = self.event_tx.send(AgentEvent::RoundStart { round });

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return RoundState::Failed(Error::Cancelled),
            response = self.gateway.complete(working, catalog) => response,
        };

        match response {
            Err(e) => RoundState::Failed(Error::Ai(e)),
            Ok(GatewayResponse::Final { text }) => RoundState::Done(text),
            Ok(GatewayResponse::ToolCalls { message }) => {
                // Duplicate ids within the round are a malformed payload
                if let Err(e) = verify_tool_pairing(std::slice::from_ref(&message)) {
                    return RoundState::Failed(e);
                }
                let calls = message.tool_calls().to_vec();
                tracing::info!(round, count = calls.len(), "model requested tools");
                working.push(message);
                RoundState::DispatchingTools(calls)
            }
        }
    }

    /// One tool message per call, in request order
    async fn dispatch(&self, calls: &[ToolCallRequest], cancel: &CancellationToken) -> Vec<Message> {
        if self.config.parallel_tools {
            futures::future::join_all(calls.iter().map(|call| self.run_call(call, cancel))).await
        } else {
            let mut results = Vec::with_capacity(calls.len());
            for call in calls {
                results.push(self.run_call(call, cancel).await);
            }
            results
        }
    }

    async fn run_call(&self, call: &ToolCallRequest, cancel: &CancellationToken) -> Message {
        let _ = self.event_tx.send(AgentEvent::ToolExecutionStart {
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
            arguments: call.arguments.clone(),
        });

        let result = if !self.executor.registry().contains(&call.name) {
            tracing::warn!(tool = %call.name, "unknown tool requested");
            ToolResult::error(format!("unknown tool: {}", call.name))
        } else {
            match parse_arguments(&call.arguments) {
                Ok(arguments) => {
                    self.executor
                        .execute(&call.name, arguments, cancel.clone())
                        .await
                }
                Err(e) => {
                    tracing::warn!(tool = %call.name, "malformed tool arguments: {}", e);
                    ToolResult::error(format!("malformed arguments for {}: {}", call.name, e))
                }
            }
        };

        let _ = self.event_tx.send(AgentEvent::ToolExecutionEnd {
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
            summary: result.summary(),
            is_error: !result.success,
        });

        Message::tool_result(&call.id, result.to_content())
    }
}

/// Blank arguments mean "no arguments"
fn parse_arguments(raw: &str) -> serde_json::Result<serde_json::Value> {
    if raw.trim().is_empty() {
        return Ok(serde_json::json!({}));
    }
    serde_json::from_str(raw)
}
