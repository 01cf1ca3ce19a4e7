use crate::types::LLMChunk;
use async_trait::async_trait;
use dc_agent_core::{Message, ToolSchema};
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LLMError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("API error: {0}")]
    Api(String),
}

pub type Result<T> = std::result::Result<T, LLMError>;

pub type LLMStream = Pin<Box<dyn Stream<Item = Result<LLMChunk>> + Send>>;

/// A hosted chat-completion endpoint that streams its answer.
///
/// Implementations do not retry; a failed request or a broken stream is
/// reported to the caller as is.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Stream a completion for `messages`, offering the model `tools`.
    async fn chat_stream(&self, messages: &[Message], tools: &[ToolSchema]) -> Result<LLMStream>;

    /// Model identifier used for logging.
    fn model_name(&self) -> &str {
        "unknown"
    }
}
