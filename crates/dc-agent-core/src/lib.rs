pub mod agent;
pub mod tools;

pub use agent::{
    AgentError, ConversationState, Message, NextStep, Role, Session, ToolInvocation, TurnEvent,
};
pub use tools::{
    parse_tool_argument_value, parse_tool_arguments, ArgumentParseError, Arguments, RegistryError,
    SharedTool, Tool, ToolCall, ToolCallAccumulator, ToolCallFragment, ToolError, ToolRegistry,
    ToolSchema,
};
