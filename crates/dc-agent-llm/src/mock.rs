//! Scripted provider for exercising the agent loop without a network.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use dc_agent_core::{Message, ToolCall, ToolCallFragment, ToolSchema};
use futures::StreamExt;

use crate::provider::{LLMError, LLMProvider, LLMStream, Result};
use crate::types::LLMChunk;

/// One scripted model turn.
#[derive(Debug, Clone)]
pub enum ScriptedTurn {
    /// Stream these chunks; `Err` items become [`LLMError::Stream`].
    Chunks(Vec<std::result::Result<LLMChunk, String>>),
    /// Fail the request before any chunk is produced.
    RequestError(String),
}

impl ScriptedTurn {
    pub fn text(text: &str) -> Self {
        Self::Chunks(vec![Ok(LLMChunk::Token(text.to_string())), Ok(LLMChunk::Done)])
    }

    pub fn tool_call(id: &str, name: &str, arguments: &str) -> Self {
        Self::tool_calls(vec![ToolCall::function(id, name, arguments)])
    }

    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        let fragments = calls.into_iter().map(ToolCallFragment::from).collect();
        Self::Chunks(vec![Ok(LLMChunk::ToolCalls(fragments)), Ok(LLMChunk::Done)])
    }
}

/// Plays back [`ScriptedTurn`]s in order and records every request.
///
/// Once the script is exhausted it answers with a plain `"Done"`.
pub struct ScriptedProvider {
    turns: Mutex<VecDeque<ScriptedTurn>>,
    requests: Mutex<Vec<Vec<Message>>>,
    chunk_delay: Option<Duration>,
}

impl ScriptedProvider {
    pub fn new(turns: Vec<ScriptedTurn>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            requests: Mutex::new(Vec::new()),
            chunk_delay: None,
        }
    }

    /// Sleep before every chunk; used to exercise timeouts and cancellation.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|requests| requests.len()).unwrap_or(0)
    }

    /// Messages sent with each request, oldest first.
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn chat_stream(&self, messages: &[Message], _tools: &[ToolSchema]) -> Result<LLMStream> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(messages.to_vec());
        }

        let turn = self
            .turns
            .lock()
            .ok()
            .and_then(|mut turns| turns.pop_front())
            .unwrap_or_else(|| ScriptedTurn::text("Done"));

        let chunks = match turn {
            ScriptedTurn::RequestError(message) => return Err(LLMError::Api(message)),
            ScriptedTurn::Chunks(chunks) => chunks,
        };

        let delay = self.chunk_delay;
        let stream = futures::stream::iter(chunks).then(move |chunk| async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            chunk.map_err(LLMError::Stream)
        });

        Ok(Box::pin(stream))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
