use serde::{Deserialize, Serialize};
use serde_json::Value;

use dc_agent_core::{Message, Role};

use crate::hooks::ToolSpan;

/// Prior conversation entry supplied by a caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryMessage {
    pub role: Role,
    pub content: String,
}

impl From<HistoryMessage> for Message {
    fn from(entry: HistoryMessage) -> Self {
        match entry.role {
            Role::System => Message::system(entry.content),
            Role::User => Message::user(entry.content),
            Role::Assistant => Message::assistant(entry.content, None),
            // A bare tool message has no call to pair with; replay it as context.
            Role::Tool => Message::user(entry.content),
        }
    }
}

/// One inbound turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<HistoryMessage>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub is_first_turn: bool,
    #[serde(default)]
    pub custom_inputs: Option<Value>,
}

impl TurnRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_history(mut self, history: Vec<HistoryMessage>) -> Self {
        self.history = history;
        self
    }

    pub fn with_custom_inputs(mut self, custom_inputs: Value) -> Self {
        self.custom_inputs = Some(custom_inputs);
        self
    }

    pub fn history_messages(&self) -> Vec<Message> {
        self.history.iter().cloned().map(Message::from).collect()
    }
}

/// Non-streaming result of a turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TurnResponse {
    pub output: String,
    pub trace_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_outputs: Option<Value>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    Completed,
    MaxIterations,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub trace_id: String,
    pub status: TurnStatus,
    /// Text of the terminal assistant message.
    pub output: String,
    pub model_calls: usize,
    pub tool_spans: Vec<ToolSpan>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn turn_request_deserializes_with_defaults() {
        let request: TurnRequest =
            serde_json::from_str(r#"{"message":"How does KC defend the slot?"}"#).unwrap();

        assert_eq!(request.message, "How does KC defend the slot?");
        assert!(request.history.is_empty());
        assert!(!request.is_first_turn);
        assert!(request.custom_inputs.is_none());
    }

    #[test]
    fn history_converts_to_messages() {
        let request = TurnRequest::new("follow-up").with_history(vec![
            HistoryMessage {
                role: Role::User,
                content: "first".to_string(),
            },
            HistoryMessage {
                role: Role::Assistant,
                content: "answer".to_string(),
            },
        ]);

        let messages = request.history_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Assistant);
        assert!(messages[1].tool_calls.is_none());
    }

    #[test]
    fn turn_response_omits_missing_custom_outputs() {
        let response = TurnResponse {
            output: "ok".to_string(),
            trace_id: "tr".to_string(),
            custom_outputs: None,
        };
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"output": "ok", "trace_id": "tr"})
        );
    }
}
