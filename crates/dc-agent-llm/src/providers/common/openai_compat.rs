//! OpenAI chat-completions wire format: request bodies and streamed deltas.
//!
//! Internal [`Message`] fields such as `id` and `created_at` never reach the wire.

use dc_agent_core::{Message, Role, ToolCallFragment, ToolSchema};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::provider::Result;
use crate::types::LLMChunk;

pub fn messages_to_openai_compat_json(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|m| {
            let role = match m.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::Tool => "tool",
            };

            let mut msg = json!({
                "role": role,
                "content": m.content,
            });

            if let Some(tool_call_id) = &m.tool_call_id {
                msg["tool_call_id"] = json!(tool_call_id);
            }

            if let Some(tool_calls) = m.tool_calls.as_ref().filter(|calls| !calls.is_empty()) {
                msg["tool_calls"] = json!(tool_calls);
                if m.content.is_empty() {
                    msg["content"] = Value::Null;
                }
            }

            msg
        })
        .collect()
}

pub fn build_openai_compat_body(
    model: &str,
    messages: &[Message],
    tools: &[ToolSchema],
    max_output_tokens: Option<u32>,
) -> Value {
    let mut body = json!({
        "model": model,
        "messages": messages_to_openai_compat_json(messages),
        "stream": true,
    });

    // Some gateways reject an empty tools array.
    if !tools.is_empty() {
        body["tools"] = json!(tools);
    }

    if let Some(max_tokens) = max_output_tokens {
        body["max_tokens"] = json!(max_tokens);
    }

    body
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Deserialize, Default)]
struct Delta {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
struct ToolCallDelta {
    #[serde(default)]
    index: Option<u32>,
    id: Option<String>,
    #[serde(rename = "type")]
    tool_type: Option<String>,
    function: Option<FunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct FunctionDelta {
    name: Option<String>,
    arguments: Option<String>,
}

impl From<ToolCallDelta> for ToolCallFragment {
    fn from(delta: ToolCallDelta) -> Self {
        let (name, arguments) = delta
            .function
            .map(|f| (f.name.unwrap_or_default(), f.arguments.unwrap_or_default()))
            .unwrap_or_default();

        ToolCallFragment {
            index: delta.index,
            id: delta.id.unwrap_or_default(),
            tool_type: delta.tool_type.unwrap_or_default(),
            name,
            arguments,
        }
    }
}

fn parse_chunk(chunk: StreamChunk) -> Vec<LLMChunk> {
    let Some(choice) = chunk.choices.into_iter().next() else {
        return Vec::new();
    };
    let delta = choice.delta;
    let mut out = Vec::new();

    if let Some(content) = delta.content.filter(|content| !content.is_empty()) {
        out.push(LLMChunk::Token(content));
    }

    if let Some(tool_calls) = delta.tool_calls.filter(|calls| !calls.is_empty()) {
        out.push(LLMChunk::ToolCalls(
            tool_calls.into_iter().map(ToolCallFragment::from).collect(),
        ));
    }

    out
}

/// Parse one SSE `data:` payload.
///
/// - `"[DONE]"` -> `[LLMChunk::Done]`
/// - a delta carrying text and tool calls -> the token, then the fragments
/// - deltas without either (role headers, finish markers) -> empty
/// - invalid JSON -> error
pub fn parse_openai_compat_sse_data(data: &str) -> Result<Vec<LLMChunk>> {
    if data.trim() == "[DONE]" {
        return Ok(vec![LLMChunk::Done]);
    }

    let chunk: StreamChunk = serde_json::from_str(data)?;
    Ok(parse_chunk(chunk))
}
