//! Slash commands for interactive mode

use std::collections::BTreeMap;

use pith_ai::Model;
use pith_ai::models::find_model;

/// Result of executing a slash command
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    /// Change the model
    ChangeModel(Model),
    /// Show a message to the user (not sent to the model)
    Message(String),
    /// Unknown command
    Unknown(String),
}

/// Parse and execute a slash command
pub fn execute_command(input: &str, current_model: &Model, available_models: &[Model]) -> CommandResult {
    let input = input.trim();
    let rest = input.strip_prefix('/').unwrap_or(input);

    let mut parts = rest.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or_default().to_lowercase();
    let args = parts.next().map(str::trim).unwrap_or("");

    match command.as_str() {
        "help" => CommandResult::Message(help_message()),
        "model" => model_command(args, current_model, available_models),
        _ => CommandResult::Unknown(command),
    }
}

/// `/model` lists models; `/model NAME` switches to the first match
fn model_command(args: &str, current_model: &Model, available_models: &[Model]) -> CommandResult {
    if args.is_empty() {
        return CommandResult::Message(list_models(current_model, available_models));
    }

    match find_model(args, available_models) {
        Some(model) => CommandResult::ChangeModel(model),
        None => CommandResult::Message(format!(
            "No model found matching '{}'\nUse /model to list available models",
            args
        )),
    }
}

fn list_models(current: &Model, models: &[Model]) -> String {
    if models.is_empty() {
        return "No models available".to_string();
    }

    let mut output = String::from("Available models:\n");

    let mut by_provider: BTreeMap<&str, Vec<&Model>> = BTreeMap::new();
    for model in models {
        by_provider.entry(model.provider.name()).or_default().push(model);
    }

    for (provider, models) in by_provider {
        output.push_str(&format!("\n{}:\n", provider));
        for model in models {
            let marker = if model.id == current.id { " *" } else { "" };
            output.push_str(&format!("  {} ({}){}\n", model.id, model.name, marker));
        }
    }

    output.push_str("\nSwitch with: /model <name>");
    output
}

fn help_message() -> String {
    r#"Type your message over one or more lines, then a line with FIN to send it.
A line with only FIN and nothing before it exits.

Control lines:
  FIN                  Send the message (or exit when empty)
  CLEAR                Clear conversation history and the screen
  /model [name]        List models or switch to a model (first line only)
  /help                Show this help message

Ctrl-C while a reply is pending cancels that request."#
        .to_string()
}
