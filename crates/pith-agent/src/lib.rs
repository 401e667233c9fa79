//! pith-agent: tool-calling orchestration with bounded history
//!
//! This crate provides the per-turn loop that drives a model gateway and a
//! registry of tools, plus the conversation history the loop runs over.

pub mod error;
pub mod events;
pub mod executor;
pub mod gateway;
pub mod history;
pub mod orchestrator;
pub mod registry;
pub mod tool;

pub use error::{Error, Result};
pub use events::AgentEvent;
pub use executor::{DEFAULT_TOOL_TIMEOUT, ToolExecutor};
pub use gateway::{Gateway, GatewayResponse, ProviderGateway};
pub use history::{Conversation, DEFAULT_HISTORY_CAP, verify_tool_pairing};
pub use orchestrator::{
    DEFAULT_MAX_ITERATIONS, Orchestrator, OrchestratorConfig, RoundState, TurnOutcome,
};
pub use registry::ToolRegistry;
pub use tool::{BoxedTool, Tool, ToolError, ToolResult};
