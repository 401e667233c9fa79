//! Orchestration event types

use serde::{Deserialize, Serialize};

/// Events emitted while a turn is being orchestrated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// A model call is about to be made
    RoundStart { round: u32 },

    /// Tool execution started
    ToolExecutionStart {
        tool_call_id: String,
        tool_name: String,
        arguments: String,
    },

    /// Tool execution completed
    ToolExecutionEnd {
        tool_call_id: String,
        tool_name: String,
        summary: String,
        is_error: bool,
    },

    /// The turn reached a terminal state
    TurnEnd { rounds: u32, answered: bool },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_is_tagged() {
        let json = serde_json::to_value(AgentEvent::RoundStart { round: 2 }).unwrap();
        assert_eq!(json["type"], "round_start");
        assert_eq!(json["round"], 2);
    }
}
