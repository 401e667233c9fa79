//! Model gateway: the boundary to the remote completion service

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use pith_ai::{CompletionOptions, Context, LlmProvider, Message, Model, Tool};

/// What one completion call produced
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayResponse {
    /// The model answered; no tools requested
    Final { text: String },
    /// An assistant message whose `tool_calls` is non-empty
    ToolCalls { message: Message },
}

/// Boundary to the completion service. Failures are terminal for the current turn.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn complete(&self, messages: &[Message], tools: &[Tool])
    -> pith_ai::Result<GatewayResponse>;
}

/// Gateway backed by an [`LlmProvider`], with a model that can be switched between turns
pub struct ProviderGateway {
    provider: Arc<dyn LlmProvider>,
    model: RwLock<Model>,
    options: CompletionOptions,
}

impl ProviderGateway {
    pub fn new(provider: Arc<dyn LlmProvider>, model: Model, options: CompletionOptions) -> Self {
        Self {
            provider,
            model: RwLock::new(model),
            options,
        }
    }

    /// Current model
    pub fn model(&self) -> Model {
        self.model.read().clone()
    }

    /// Switch the model used by subsequent calls
    pub fn set_model(&self, model: Model) {
        tracing::info!(model = %model.id, "switching model");
        *self.model.write() = model;
    }
}

#[async_trait]
impl Gateway for ProviderGateway {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[Tool],
    ) -> pith_ai::Result<GatewayResponse> {
        let model = self.model();
        let context = Context {
            messages: messages.to_vec(),
            tools: tools.to_vec(),
        };

        let completion = self.provider.complete(&model, &context, &self.options).await?;
        tracing::debug!(
            model = %model.id,
            input_tokens = completion.usage.input,
            output_tokens = completion.usage.output,
            stop_reason = ?completion.stop_reason,
            "completion received"
        );

        Ok(into_response(completion.message))
    }
}

/// Classify an assistant message
pub fn into_response(message: Message) -> GatewayResponse {
    if message.tool_calls().is_empty() {
        GatewayResponse::Final {
            text: message.text().to_string(),
        }
    } else {
        GatewayResponse::ToolCalls { message }
    }
}
