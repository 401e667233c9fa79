//! pith-ai: chat-completion provider abstraction
//!
//! Message and tool types shared by the orchestrator, the fixed model registry,
//! and an OpenAI-compatible provider (xAI by default).

pub mod error;
pub mod models;
pub mod providers;
pub mod types;

pub use error::{Error, Result};
pub use providers::LlmProvider;
pub use types::*;
