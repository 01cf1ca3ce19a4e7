use std::time::Duration;

pub const DEFAULT_MAX_ITERATIONS: usize = 20;

/// Configuration for the tool-calling loop.
#[derive(Debug, Clone)]
pub struct AgentLoopConfig {
    /// Upper bound on model calls within a single turn.
    pub max_iterations: usize,
    /// Prepended to every turn's conversation; never stored in session history.
    pub system_prompt: Option<String>,
    /// Applies to the initial request and to each gap between streamed chunks.
    pub model_timeout: Duration,
    pub tool_timeout: Duration,
}

impl Default for AgentLoopConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            system_prompt: None,
            model_timeout: Duration::from_secs(120),
            tool_timeout: Duration::from_secs(60),
        }
    }
}
