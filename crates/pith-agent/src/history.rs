//! Bounded conversation history: a persistent system message plus a trailing window.

use std::collections::HashSet;

use pith_ai::{Message, Role};

use crate::error::{Error, Result};

/// Default cap: system message + 3 most recent messages
pub const DEFAULT_HISTORY_CAP: usize = 4;

/// Ordered message log. Index 0 is always the system message.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    messages: Vec<Message>,
    cap: usize,
}

impl Conversation {
    /// Create a conversation holding only the system message. A cap below 1 is raised to 1.
    pub fn new(system_prompt: impl Into<String>, cap: usize) -> Self {
        Self {
            messages: vec![Message::system(system_prompt)],
            cap: cap.max(1),
        }
    }

    pub fn append_user(&mut self, text: impl Into<String>) {
        self.messages.push(Message::user(text));
    }

    pub fn append_assistant(&mut self, text: impl Into<String>) {
        self.messages.push(Message::assistant(text));
    }

    /// Keep `[system] + last (cap - 1)` messages, in order. Idempotent.
    pub fn trim(&mut self) {
        if self.messages.len() <= self.cap {
            return;
        }
        let tail_start = self.messages.len() - (self.cap - 1);
        let before = self.messages.len();
        self.messages.drain(1..tail_start);
        tracing::debug!(before, after = self.messages.len(), "trimmed history");
    }

    /// Reset to the system message only
    pub fn clear(&mut self) {
        self.messages.truncate(1);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Never true: the system message is always present
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn system_prompt(&self) -> &str {
        self.messages[0].text()
    }

    /// Debug rendering of every message, for the log on clear
    pub fn dump(&self) -> String {
        self.messages
            .iter()
            .enumerate()
            .map(|(i, m)| format!("[{}] {}: {}", i, m.role().as_str(), m.text()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Check that every tool message answers a request of the closest preceding
/// assistant message, within an unbroken run of tool messages, and that no id
/// repeats inside one round.
pub fn verify_tool_pairing(messages: &[Message]) -> Result<()> {
    let mut open: Option<HashSet<&str>> = None;

    for (index, message) in messages.iter().enumerate() {
        match message {
            Message::Assistant { tool_calls, .. } if !tool_calls.is_empty() => {
                let mut ids = HashSet::new();
                for call in tool_calls {
                    if !ids.insert(call.id.as_str()) {
                        return Err(Error::Protocol(format!(
                            "duplicate tool call id '{}' at message {}",
                            call.id, index
                        )));
                    }
                }
                open = Some(ids);
            }
            Message::Tool { tool_call_id, .. } => {
                let answered = open
                    .as_mut()
                    .is_some_and(|ids| ids.remove(tool_call_id.as_str()));
                if !answered {
                    return Err(Error::Protocol(format!(
                        "tool message {} answers unknown call '{}'",
                        index, tool_call_id
                    )));
                }
            }
            other => {
                if other.role() == Role::System && index != 0 {
                    return Err(Error::Protocol(format!(
                        "system message at index {}",
                        index
                    )));
                }
                open = None;
            }
        }
    }
    Ok(())
}
