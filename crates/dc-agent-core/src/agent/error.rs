use std::time::Duration;

use thiserror::Error;

use crate::tools::ArgumentParseError;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error(transparent)]
    ArgumentParse(#[from] ArgumentParseError),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Stream transport error: {0}")]
    StreamTransport(String),

    #[error("{operation} timed out after {}ms", .limit.as_millis())]
    Timeout { operation: String, limit: Duration },

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Cancelled")]
    Cancelled,
}

impl From<crate::tools::ToolError> for AgentError {
    fn from(error: crate::tools::ToolError) -> Self {
        match error {
            crate::tools::ToolError::NotFound(name) => AgentError::UnknownTool(name),
        }
    }
}
