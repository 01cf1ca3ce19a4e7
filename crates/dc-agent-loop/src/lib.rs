pub mod config;
pub mod hooks;
pub mod runner;
pub mod session;
pub mod stream;
pub mod types;

pub use config::AgentLoopConfig;
pub use hooks::{LoggingToolHook, ToolCallHook, ToolSpan};
pub use runner::{DcAgent, MAX_ITERATIONS_MESSAGE};
pub use session::{SessionManager, SessionTurnRequest, SessionTurnResponse};
pub use types::{HistoryMessage, TurnOutcome, TurnRequest, TurnResponse, TurnStatus};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
