use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use dc_agent_core::tools::{ToolCall, ToolCallAccumulator};
use dc_agent_core::{AgentError, TurnEvent};
use dc_agent_llm::{LLMChunk, LLMStream};

/// Everything one model response contributed, ready to become a single
/// assistant message.
pub struct StreamHandlingOutput {
    pub content: String,
    pub token_count: usize,
    pub tool_calls: Vec<ToolCall>,
}

/// Drain `stream` into one [`StreamHandlingOutput`], forwarding text deltas as
/// [`TurnEvent::Token`].
///
/// Tool calls are only finalized once the stream signals `Done` or ends.
/// `chunk_timeout` bounds the wait for each individual chunk.
pub async fn consume_llm_stream(
    mut stream: LLMStream,
    event_tx: &mpsc::Sender<TurnEvent>,
    cancel_token: &CancellationToken,
    chunk_timeout: Duration,
    trace_id: &str,
) -> Result<StreamHandlingOutput, AgentError> {
    let mut content = String::new();
    let mut token_count = 0usize;
    let mut tool_calls = ToolCallAccumulator::new();

    loop {
        let next = tokio::select! {
            _ = cancel_token.cancelled() => return Err(AgentError::Cancelled),
            next = tokio::time::timeout(chunk_timeout, stream.next()) => next,
        };

        let chunk_result = match next {
            Ok(Some(chunk_result)) => chunk_result,
            Ok(None) => break,
            Err(_) => {
                return Err(AgentError::Timeout {
                    operation: "model stream".to_string(),
                    limit: chunk_timeout,
                })
            }
        };

        match chunk_result {
            Ok(LLMChunk::Token(token)) => {
                if token.is_empty() {
                    continue;
                }
                token_count += 1;
                content.push_str(&token);

                let _ = event_tx.send(TurnEvent::Token { content: token }).await;
            }
            Ok(LLMChunk::ToolCalls(partial_calls)) => {
                log::debug!(
                    "[{}] Received {} tool call parts",
                    trace_id,
                    partial_calls.len()
                );
                tool_calls.extend(partial_calls);
            }
            Ok(LLMChunk::Done) => {
                log::debug!("[{}] LLM stream completed", trace_id);
                break;
            }
            Err(error) => {
                log::error!("[{}] LLM stream failed: {}", trace_id, error);
                return Err(AgentError::StreamTransport(error.to_string()));
            }
        }
    }

    Ok(StreamHandlingOutput {
        content,
        token_count,
        tool_calls: tool_calls.finalize(),
    })
}

#[cfg(test)]
mod tests {
    use futures::stream;

    use dc_agent_core::tools::ToolCallFragment;
    use dc_agent_llm::LLMError;

    use super::*;

    fn build_stream(items: Vec<dc_agent_llm::Result<LLMChunk>>) -> LLMStream {
        Box::pin(stream::iter(items))
    }

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn accumulates_tokens_and_tool_calls() {
        let stream = build_stream(vec![
            Ok(LLMChunk::Token("Let me ".to_string())),
            Ok(LLMChunk::Token("check".to_string())),
            Ok(LLMChunk::ToolCalls(vec![ToolCallFragment::new(
                "call_1",
                "screen_play_tendencies",
                "{",
            )])),
            Ok(LLMChunk::ToolCalls(vec![ToolCallFragment::new("call_1", "", "}")])),
            Ok(LLMChunk::Done),
        ]);

        let (event_tx, mut event_rx) = mpsc::channel::<TurnEvent>(8);
        let output = consume_llm_stream(stream, &event_tx, &CancellationToken::new(), TIMEOUT, "t-1")
            .await
            .expect("stream should succeed");

        assert_eq!(output.content, "Let me check");
        assert_eq!(output.token_count, 2);
        assert_eq!(output.tool_calls.len(), 1);
        assert_eq!(output.tool_calls[0].function.name, "screen_play_tendencies");
        assert_eq!(output.tool_calls[0].function.arguments, "{}");

        assert_eq!(
            event_rx.recv().await,
            Some(TurnEvent::Token {
                content: "Let me ".to_string()
            })
        );
    }

    #[tokio::test]
    async fn stops_reading_at_done() {
        let stream = build_stream(vec![
            Ok(LLMChunk::Token("a".to_string())),
            Ok(LLMChunk::Done),
            Ok(LLMChunk::Token("ignored".to_string())),
        ]);

        let (event_tx, _event_rx) = mpsc::channel::<TurnEvent>(8);
        let output = consume_llm_stream(stream, &event_tx, &CancellationToken::new(), TIMEOUT, "t")
            .await
            .unwrap();

        assert_eq!(output.content, "a");
    }

    #[tokio::test]
    async fn end_of_stream_without_done_still_finalizes() {
        let stream = build_stream(vec![Ok(LLMChunk::ToolCalls(vec![ToolCallFragment::new(
            "call_9",
            "tendencies_by_drive_start",
            "{}",
        )]))]);

        let (event_tx, _event_rx) = mpsc::channel::<TurnEvent>(8);
        let output = consume_llm_stream(stream, &event_tx, &CancellationToken::new(), TIMEOUT, "t")
            .await
            .unwrap();

        assert_eq!(output.tool_calls.len(), 1);
    }

    #[tokio::test]
    async fn transport_error_is_reported() {
        let stream = build_stream(vec![
            Ok(LLMChunk::Token("partial".to_string())),
            Err(LLMError::Stream("connection reset".to_string())),
        ]);

        let (event_tx, _event_rx) = mpsc::channel::<TurnEvent>(8);
        let result =
            consume_llm_stream(stream, &event_tx, &CancellationToken::new(), TIMEOUT, "t").await;

        assert!(
            matches!(result, Err(AgentError::StreamTransport(message)) if message.contains("connection reset"))
        );
    }

    #[tokio::test]
    async fn stalled_stream_times_out() {
        let stream: LLMStream = Box::pin(stream::pending());

        let (event_tx, _event_rx) = mpsc::channel::<TurnEvent>(8);
        let result = consume_llm_stream(
            stream,
            &event_tx,
            &CancellationToken::new(),
            Duration::from_millis(20),
            "t",
        )
        .await;

        assert!(matches!(
            result,
            Err(AgentError::Timeout { limit, .. }) if limit == Duration::from_millis(20)
        ));
    }

    #[tokio::test]
    async fn cancelled_token_stops_consumption() {
        let stream: LLMStream = Box::pin(stream::pending());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let (event_tx, _event_rx) = mpsc::channel::<TurnEvent>(8);
        let result = consume_llm_stream(stream, &event_tx, &cancel, TIMEOUT, "t").await;

        assert!(matches!(result, Err(AgentError::Cancelled)));
    }
}
