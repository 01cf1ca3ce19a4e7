pub mod accumulator;
pub mod args;
pub mod registry;
pub mod types;

pub use accumulator::{ToolCallAccumulator, ToolCallFragment};
pub use args::{parse_tool_argument_value, parse_tool_arguments, ArgumentParseError, Arguments};
pub use registry::{RegistryError, SharedTool, Tool, ToolError, ToolRegistry};
pub use types::{FunctionCall, FunctionSchema, ToolCall, ToolSchema};
