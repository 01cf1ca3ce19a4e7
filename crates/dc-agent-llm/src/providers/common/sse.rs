//! SSE response body -> [`LLMStream`].

use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use reqwest::Response;

use crate::provider::{LLMError, LLMStream, Result};
use crate::types::LLMChunk;

/// Convert an SSE HTTP [`Response`] into an [`LLMStream`].
///
/// `parse_data` sees the `data:` payload of every non-blank event and returns
/// the chunks it carries, possibly none. Transport and parse failures both
/// surface as [`LLMError::Stream`] items; the stream is not retried.
pub fn llm_stream_from_sse<H>(response: Response, mut parse_data: H) -> LLMStream
where
    H: FnMut(&str) -> Result<Vec<LLMChunk>> + Send + 'static,
{
    let stream = response
        .bytes_stream()
        .eventsource()
        .flat_map(move |event| {
            let items: Vec<Result<LLMChunk>> = match event {
                Err(error) => vec![Err(LLMError::Stream(error.to_string()))],
                Ok(event) if event.data.trim().is_empty() => Vec::new(),
                Ok(event) => match parse_data(&event.data) {
                    Ok(chunks) => chunks.into_iter().map(Ok).collect(),
                    Err(LLMError::Stream(message)) => vec![Err(LLMError::Stream(message))],
                    Err(other) => vec![Err(LLMError::Stream(other.to_string()))],
                },
            };
            futures_util::stream::iter(items)
        });

    Box::pin(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn network_tests_disabled() -> bool {
        std::env::var_os("CODEX_SANDBOX_NETWORK_DISABLED").is_some()
    }

    async fn serve(body: &'static str) -> (MockServer, Response) {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sse"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .mount(&mock_server)
            .await;

        let response = reqwest::Client::new()
            .get(format!("{}/sse", mock_server.uri()))
            .send()
            .await
            .expect("response");

        (mock_server, response)
    }

    #[tokio::test]
    async fn skips_blank_and_filtered_events() {
        if network_tests_disabled() {
            return;
        }

        let (_server, response) = serve(concat!(
            "data: cover\n\n",
            "data: \n\n",
            "data: skip\n\n",
            "data: two\n\n",
        ))
        .await;

        let mut stream = llm_stream_from_sse(response, |data| {
            if data == "skip" {
                return Ok(Vec::new());
            }
            Ok(vec![LLMChunk::Token(data.to_string())])
        });

        let mut out = Vec::new();
        while let Some(item) = stream.next().await {
            out.push(item.expect("chunk"));
        }

        assert_eq!(
            out,
            vec![
                LLMChunk::Token("cover".to_string()),
                LLMChunk::Token("two".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn one_event_can_yield_several_chunks() {
        if network_tests_disabled() {
            return;
        }

        let (_server, response) = serve("data: both\n\n").await;

        let mut stream = llm_stream_from_sse(response, |data| {
            Ok(vec![LLMChunk::Token(data.to_string()), LLMChunk::Done])
        });

        assert_eq!(
            stream.next().await.map(|item| item.expect("chunk")),
            Some(LLMChunk::Token("both".to_string()))
        );
        assert_eq!(
            stream.next().await.map(|item| item.expect("chunk")),
            Some(LLMChunk::Done)
        );
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn parse_errors_become_stream_errors() {
        if network_tests_disabled() {
            return;
        }

        let (_server, response) = serve("data: boom\n\n").await;

        let mut stream =
            llm_stream_from_sse(response, |_data| Err(LLMError::Api("boom".to_string())));

        match stream.next().await {
            Some(Err(LLMError::Stream(message))) => assert!(message.contains("API error")),
            other => panic!("expected LLMError::Stream, got: {other:?}"),
        }
    }
}
