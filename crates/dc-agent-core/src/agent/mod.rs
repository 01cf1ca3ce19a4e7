pub mod error;
pub mod events;
pub mod state;
pub mod types;

pub use error::AgentError;
pub use events::{ToolInvocation, TurnEvent};
pub use state::{ConversationState, NextStep};
pub use types::{Message, Role, Session};
