//! Tool registry: name -> (tool, compiled parameter schema)

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::tool::{BoxedTool, to_api_tool};

struct Registered {
    tool: BoxedTool,
    validator: Option<Arc<jsonschema::Validator>>,
}

/// Registered tools, advertised to the model as a static catalog.
///
/// Adding a tool never touches the orchestrator loop.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Registered>,
    /// Registration order, which is also catalog order
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register(&mut self, tool: BoxedTool) {
        let name = tool.name().to_string();
        let schema = tool.parameters_schema();
        let validator = match jsonschema::validator_for(&schema) {
            Ok(validator) => Some(Arc::new(validator)),
            Err(e) => {
                tracing::warn!(
                    "Invalid tool parameter schema for '{}', skipping validation: {}",
                    name,
                    e
                );
                None
            }
        };

        if self.tools.insert(name.clone(), Registered { tool, validator }).is_none() {
            self.order.push(name);
        }
    }

    /// Builder-style registration
    pub fn with_tool(mut self, tool: BoxedTool) -> Self {
        self.register(tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<BoxedTool> {
        self.tools.get(name).map(|r| Arc::clone(&r.tool))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tool names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    /// The static catalog sent with every completion request
    pub fn catalog(&self) -> Vec<pith_ai::Tool> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|r| to_api_tool(r.tool.as_ref()))
            .collect()
    }

    /// Validate arguments against the tool's declared schema.
    /// Returns `Some(error_message)` if validation fails.
    pub fn validate(&self, name: &str, args: &serde_json::Value) -> Option<String> {
        let validator = self.tools.get(name)?.validator.as_ref()?;
        validate_with_validator(args, validator)
    }
}

/// Validate tool arguments using a pre-compiled validator.
fn validate_with_validator(
    args: &serde_json::Value,
    validator: &jsonschema::Validator,
) -> Option<String> {
    let errors: Vec<String> = validator
        .iter_errors(args)
        .map(|e| {
            let path = e.instance_path.to_string();
            if path.is_empty() {
                e.to_string()
            } else {
                format!("{}: {}", path, e)
            }
        })
        .collect();

    if errors.is_empty() {
        None
    } else {
        Some(format!(
            "Tool argument validation failed:\n{}",
            errors.join("\n")
        ))
    }
}
