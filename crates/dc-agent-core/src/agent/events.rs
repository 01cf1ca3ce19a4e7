use serde::{Deserialize, Serialize};

/// Outbound streaming event for one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    Token {
        content: String,
    },

    ToolCall {
        tool: ToolInvocation,
    },

    Done {
        trace_id: String,
    },

    Error {
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub name: String,
    /// Argument payload exactly as the model produced it.
    pub arguments: String,
}

impl TurnEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnEvent::Done { .. } | TurnEvent::Error { .. })
    }
}
