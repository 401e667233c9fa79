//! Model registry: the fixed set of models the client can switch between.

use crate::{Model, Provider};

/// Default model for new sessions.
pub const DEFAULT_MODEL_ID: &str = "grok-3-mini-beta";

struct ModelEntry {
    id: &'static str,
    name: &'static str,
    context_window: u32,
}

const MODEL_ENTRIES: &[ModelEntry] = &[
    ModelEntry {
        id: "grok-3-mini-beta",
        name: "Grok 3 Mini (beta)",
        context_window: 131_072,
    },
    ModelEntry {
        id: "grok-3-beta",
        name: "Grok 3 (beta)",
        context_window: 131_072,
    },
];

impl ModelEntry {
    fn to_model(&self) -> Model {
        Model {
            id: self.id.to_string(),
            name: self.name.to_string(),
            provider: Provider::XAI,
            base_url: Provider::XAI.default_base_url().to_string(),
            context_window: self.context_window,
            headers: Default::default(),
        }
    }
}

/// Look up a model by exact ID.
pub fn get_model_by_id(id: &str) -> Option<Model> {
    MODEL_ENTRIES
        .iter()
        .find(|e| e.id == id)
        .map(|e| e.to_model())
}

/// Get all registered models.
pub fn get_all_models() -> Vec<Model> {
    MODEL_ENTRIES.iter().map(|e| e.to_model()).collect()
}

/// Resolve a user query: exact id, then id substring, then name substring.
pub fn find_model(query: &str, models: &[Model]) -> Option<Model> {
    let query_lower = query.trim().to_lowercase();
    if query_lower.is_empty() {
        return None;
    }

    if let Some(model) = models.iter().find(|m| m.id.to_lowercase() == query_lower) {
        return Some(model.clone());
    }

    if let Some(model) = models
        .iter()
        .find(|m| m.id.to_lowercase().contains(&query_lower))
    {
        return Some(model.clone());
    }

    models
        .iter()
        .find(|m| m.name.to_lowercase().contains(&query_lower))
        .cloned()
}
