use uuid::Uuid;

use crate::tools::{FunctionCall, ToolCall};

/// One streamed piece of a tool call, as a provider sends it.
///
/// `index` is the provider's slot for the call within the response. When it
/// is present it is the only key used for merging; `id` and `name` usually
/// arrive once, on the first fragment for that slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCallFragment {
    pub index: Option<u32>,
    pub id: String,
    pub tool_type: String,
    pub name: String,
    pub arguments: String,
}

impl ToolCallFragment {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            index: None,
            id: id.into(),
            tool_type: String::new(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    pub fn at(mut self, index: u32) -> Self {
        self.index = Some(index);
        self
    }

    fn is_blank(&self) -> bool {
        self.id.is_empty() && self.name.is_empty() && self.arguments.is_empty()
    }
}

impl From<ToolCall> for ToolCallFragment {
    fn from(call: ToolCall) -> Self {
        Self {
            index: None,
            id: call.id,
            tool_type: call.tool_type,
            name: call.function.name,
            arguments: call.function.arguments,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct PendingCall {
    index: Option<u32>,
    id: String,
    tool_type: String,
    name: String,
    arguments: String,
}

impl PendingCall {
    fn absorb(&mut self, fragment: ToolCallFragment) {
        if self.index.is_none() {
            self.index = fragment.index;
        }
        if self.id.is_empty() {
            self.id = fragment.id;
        }
        if !fragment.name.is_empty() {
            self.name = fragment.name;
        }
        if !fragment.tool_type.is_empty() {
            self.tool_type = fragment.tool_type;
        }
        self.arguments.push_str(&fragment.arguments);
    }

    fn into_call(self) -> Option<ToolCall> {
        if self.name.trim().is_empty() {
            log::warn!(
                "Dropping tool call fragment without a name (id={:?}, {} argument bytes)",
                self.id,
                self.arguments.len()
            );
            return None;
        }

        Some(ToolCall {
            id: if self.id.is_empty() {
                format!("call_{}", Uuid::new_v4())
            } else {
                self.id
            },
            tool_type: if self.tool_type.is_empty() {
                "function".to_string()
            } else {
                self.tool_type
            },
            function: FunctionCall {
                name: self.name,
                arguments: self.arguments,
            },
        })
    }
}

/// Collects streamed tool-call fragments for one model response.
///
/// A fragment joins an existing call when it carries the same `index`, or
/// failing that the same `id`. A fragment with neither index, id nor name
/// continues the most recent call. Anything else opens a new call, so
/// parallel calls to the same tool stay separate. Nothing is usable until
/// [`finalize`] runs after the stream has ended.
///
/// [`finalize`]: ToolCallAccumulator::finalize
#[derive(Debug, Default, Clone)]
pub struct ToolCallAccumulator {
    pending: Vec<PendingCall>,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fragment: impl Into<ToolCallFragment>) {
        let fragment = fragment.into();
        if fragment.is_blank() {
            return;
        }

        match self.slot_for(&fragment) {
            Some(slot) => self.pending[slot].absorb(fragment),
            None => {
                let mut call = PendingCall::default();
                call.absorb(fragment);
                self.pending.push(call);
            }
        }
    }

    pub fn extend<I, F>(&mut self, fragments: I)
    where
        I: IntoIterator<Item = F>,
        F: Into<ToolCallFragment>,
    {
        for fragment in fragments {
            self.push(fragment);
        }
    }

    fn slot_for(&self, fragment: &ToolCallFragment) -> Option<usize> {
        if let Some(index) = fragment.index {
            return self.pending.iter().position(|call| call.index == Some(index));
        }

        if !fragment.id.is_empty() {
            return self.pending.iter().position(|call| call.id == fragment.id);
        }

        let last = self.pending.len().checked_sub(1)?;
        let continues_last = fragment.name.is_empty() || self.pending[last].name.is_empty();
        continues_last.then_some(last)
    }

    /// Calls in arrival order. Calls that never received a name are dropped
    /// with a warning; anonymous calls get a generated `call_` id.
    pub fn finalize(self) -> Vec<ToolCall> {
        self.pending
            .into_iter()
            .filter_map(PendingCall::into_call)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_keyed_fragments_merge() {
        let mut accumulator = ToolCallAccumulator::new();

        accumulator.push(ToolCallFragment::new("call_1", "third_down_defense", "{\"team\": \""));
        accumulator.push(ToolCallFragment::new("call_1", "", "BAL"));
        accumulator.push(ToolCallFragment::new("call_1", "", "\"}"));

        let calls = accumulator.finalize();

        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].function.name, "third_down_defense");
        assert_eq!(calls[0].function.arguments, "{\"team\": \"BAL\"}");
    }

    #[test]
    fn same_tool_at_two_indexes_stays_two_calls() {
        let mut accumulator = ToolCallAccumulator::new();
        accumulator.extend(vec![
            ToolCallFragment::new("", "lookup", "").at(0),
            ToolCallFragment::new("", "lookup", "").at(1),
            ToolCallFragment::new("", "", "{\"team\":\"KC\"}").at(0),
            ToolCallFragment::new("", "", "{\"team\":\"BUF\"}").at(1),
        ]);

        let calls = accumulator.finalize();

        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].function.name, "lookup");
        assert_eq!(calls[0].function.arguments, "{\"team\":\"KC\"}");
        assert_eq!(calls[1].function.name, "lookup");
        assert_eq!(calls[1].function.arguments, "{\"team\":\"BUF\"}");
        assert_ne!(calls[0].id, calls[1].id);
    }

    #[test]
    fn index_wins_over_late_id() {
        let mut accumulator = ToolCallAccumulator::new();
        accumulator.push(ToolCallFragment::new("", "coverage", "{").at(0));
        accumulator.push(ToolCallFragment::new("call_x", "", "}").at(0));

        let calls = accumulator.finalize();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_x");
        assert_eq!(calls[0].function.arguments, "{}");
    }

    #[test]
    fn unindexed_repeat_name_opens_new_call() {
        let mut accumulator = ToolCallAccumulator::new();
        accumulator.extend(vec![
            ToolCallFragment::new("", "lookup", "{\"team\":\"KC\"}"),
            ToolCallFragment::new("", "lookup", "{\"team\":\"BUF\"}"),
        ]);

        assert_eq!(accumulator.len(), 2);
    }

    #[test]
    fn unnamed_call_is_dropped() {
        let mut accumulator = ToolCallAccumulator::new();
        accumulator.push(ToolCallFragment::new("call_1", "", "{}"));

        assert_eq!(accumulator.len(), 1);
        assert!(accumulator.finalize().is_empty());
    }

    #[test]
    fn argument_only_fragment_extends_last_call() {
        let mut accumulator = ToolCallAccumulator::new();
        accumulator.push(ToolCallFragment::new("call_1", "blitz", "{\"a\":"));
        accumulator.push(ToolCallFragment::new("", "", "1}"));

        let calls = accumulator.finalize();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].function.arguments, "{\"a\":1}");
    }

    #[test]
    fn parallel_calls_keep_arrival_order() {
        let mut accumulator = ToolCallAccumulator::new();
        accumulator.extend(vec![
            ToolCall::function("call_a", "coverage", "{"),
            ToolCall::function("call_b", "pressure", "{}"),
            ToolCall::function("call_a", "", "}"),
        ]);

        let calls = accumulator.finalize();
        let ids: Vec<&str> = calls.iter().map(|call| call.id.as_str()).collect();

        assert_eq!(ids, vec!["call_a", "call_b"]);
        assert_eq!(calls[0].function.arguments, "{}");
        assert_eq!(calls[0].tool_type, "function");
    }

    #[test]
    fn anonymous_call_gets_generated_id() {
        let mut accumulator = ToolCallAccumulator::new();
        accumulator.push(ToolCallFragment::new("", "coverage", "{}"));

        let calls = accumulator.finalize();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].id.starts_with("call_"));
    }

    #[test]
    fn blank_fragment_is_ignored() {
        let mut accumulator = ToolCallAccumulator::new();
        accumulator.push(ToolCallFragment::default().at(3));
        assert!(accumulator.is_empty());
    }
}
