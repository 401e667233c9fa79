//! LLM provider implementations

pub mod openai;

use crate::{Completion, CompletionOptions, Context, Error, Model, Result};
use async_trait::async_trait;

/// Trait for LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Request one complete (non-streamed) response from the LLM
    async fn complete(
        &self,
        model: &Model,
        context: &Context,
        options: &CompletionOptions,
    ) -> Result<Completion>;
}

/// Get an API key from a provided value or the environment
pub fn get_api_key(provided: Option<&str>, env_var: &str) -> Result<String> {
    if let Some(key) = provided.filter(|k| !k.trim().is_empty()) {
        return Ok(key.to_string());
    }

    std::env::var(env_var)
        .ok()
        .filter(|k| !k.trim().is_empty())
        .ok_or(Error::InvalidApiKey)
}
