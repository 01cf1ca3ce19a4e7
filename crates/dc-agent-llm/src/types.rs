use dc_agent_core::ToolCallFragment;

/// One incremental unit of a streamed completion.
#[derive(Debug, Clone, PartialEq)]
pub enum LLMChunk {
    /// Text delta.
    Token(String),
    /// Partial function-call fragments; feed them to a `ToolCallAccumulator`
    /// until the stream ends.
    ToolCalls(Vec<ToolCallFragment>),
    /// The server signalled the end of the response.
    Done,
}
