use std::collections::HashSet;

use serde::Serialize;

use crate::agent::types::{Message, Role};
use crate::tools::ToolCall;

/// What the loop has to do next, read off the tail of the conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum NextStep {
    /// The model has to be asked for the next message.
    CallModel,
    /// The trailing assistant message requested this call and no result exists yet.
    ResolveTool(ToolCall),
    /// The trailing assistant message is a final answer.
    Done(String),
}

/// Ordered, append-only message log for one turn.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversationState {
    messages: Vec<Message>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    pub fn next_step(&self) -> NextStep {
        let Some(last) = self.messages.last() else {
            return NextStep::CallModel;
        };

        if last.role == Role::Assistant && !last.has_tool_calls() {
            return NextStep::Done(last.content.clone());
        }

        match self.pending_tool_calls().into_iter().next() {
            Some(call) => NextStep::ResolveTool(call.clone()),
            None => NextStep::CallModel,
        }
    }

    /// Calls from the trailing assistant tool-call message that have no
    /// result yet, in request order.
    pub fn pending_tool_calls(&self) -> Vec<&ToolCall> {
        let trailing_results = self
            .messages
            .iter()
            .rev()
            .take_while(|message| message.role == Role::Tool)
            .count();
        let request_index = self.messages.len() - trailing_results;

        let Some(request) = request_index
            .checked_sub(1)
            .and_then(|index| self.messages.get(index))
        else {
            return Vec::new();
        };

        let Some(calls) = request
            .tool_calls
            .as_ref()
            .filter(|_| request.role == Role::Assistant)
        else {
            return Vec::new();
        };

        let answered: HashSet<&str> = self.messages[request_index..]
            .iter()
            .filter_map(|message| message.tool_call_id.as_deref())
            .collect();

        calls
            .iter()
            .filter(|call| !answered.contains(call.id.as_str()))
            .collect()
    }

    /// Text of the newest assistant message, if any.
    pub fn last_assistant_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|message| message.role == Role::Assistant)
            .map(|message| message.content.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(id: &str) -> ToolCall {
        ToolCall::function(id, "red_zone_defense", "{}")
    }

    #[test]
    fn empty_conversation_needs_model() {
        assert_eq!(ConversationState::new().next_step(), NextStep::CallModel);
    }

    #[test]
    fn user_message_needs_model() {
        let mut state = ConversationState::new();
        state.append(Message::system("be terse"));
        state.append(Message::user("How does PHI defend 3rd and long?"));

        assert_eq!(state.next_step(), NextStep::CallModel);
    }

    #[test]
    fn assistant_text_is_done() {
        let mut state = ConversationState::new();
        state.append(Message::user("q"));
        state.append(Message::assistant("Cover 3 mostly.", None));

        assert_eq!(state.next_step(), NextStep::Done("Cover 3 mostly.".to_string()));
    }

    #[test]
    fn assistant_tool_call_awaits_tool() {
        let mut state = ConversationState::new();
        state.append(Message::user("q"));
        state.append(Message::assistant("", Some(vec![call("c1")])));

        assert_eq!(state.next_step(), NextStep::ResolveTool(call("c1")));
    }

    #[test]
    fn parallel_calls_resolve_in_order() {
        let mut state = ConversationState::new();
        state.append(Message::user("q"));
        state.append(Message::assistant("", Some(vec![call("c1"), call("c2")])));

        assert_eq!(state.next_step(), NextStep::ResolveTool(call("c1")));

        state.append(Message::tool_result("c1", "r1"));
        assert_eq!(state.next_step(), NextStep::ResolveTool(call("c2")));

        state.append(Message::tool_result("c2", "r2"));
        assert_eq!(state.next_step(), NextStep::CallModel);
        assert!(state.pending_tool_calls().is_empty());
    }

    #[test]
    fn append_is_ordered_and_last_is_newest() {
        let mut state = ConversationState::new();
        state.append(Message::user("one"));
        state.append(Message::assistant("two", None));

        assert_eq!(state.len(), 2);
        assert_eq!(state.last().map(|m| m.content.as_str()), Some("two"));
        assert_eq!(state.messages()[0].content, "one");
    }

    #[test]
    fn last_assistant_text_skips_tool_messages() {
        let mut state = ConversationState::new();
        state.append(Message::assistant("thinking", Some(vec![call("c1")])));
        state.append(Message::tool_result("c1", "rows"));

        assert_eq!(state.last_assistant_text(), Some("thinking"));
    }
}
