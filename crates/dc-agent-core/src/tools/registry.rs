use std::sync::Arc;

use async_trait::async_trait;
use indexmap::{map::Entry, IndexMap};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::tools::{FunctionSchema, ToolSchema};

/// A named remote function the model may call.
///
/// `execute` returns `Err` for failures the model should see (bad input, empty
/// result set, upstream outage). The registry hands that text back as the tool
/// result instead of aborting the turn.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> Value;
    async fn execute(&self, args: Map<String, Value>) -> Result<String, String>;

    fn to_schema(&self) -> ToolSchema {
        ToolSchema {
            schema_type: "function".to_string(),
            function: FunctionSchema {
                name: self.name().to_string(),
                description: self.description().to_string(),
                parameters: self.parameters_schema(),
            },
        }
    }
}

pub type SharedTool = Arc<dyn Tool>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("tool with name '{0}' already registered")]
    DuplicateTool(String),

    #[error("invalid tool: {0}")]
    InvalidTool(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),
}

/// Name-keyed tool table. Populated at startup, then shared read-only.
#[derive(Default)]
pub struct ToolRegistry {
    tools: IndexMap<String, SharedTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T>(&mut self, tool: T) -> Result<(), RegistryError>
    where
        T: Tool + 'static,
    {
        self.register_shared(Arc::new(tool))
    }

    pub fn register_shared(&mut self, tool: SharedTool) -> Result<(), RegistryError> {
        let name = tool.name().trim().to_string();

        if name.is_empty() {
            return Err(RegistryError::InvalidTool(
                "tool name cannot be empty".to_string(),
            ));
        }

        match self.tools.entry(name) {
            Entry::Occupied(entry) => Err(RegistryError::DuplicateTool(entry.key().clone())),
            Entry::Vacant(entry) => {
                log::debug!("Registered tool '{}'", entry.key());
                entry.insert(tool);
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<SharedTool> {
        self.tools.get(name).map(Arc::clone)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Schemas in registration order.
    pub fn specs(&self) -> Vec<ToolSchema> {
        self.tools.values().map(|tool| tool.to_schema()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// Runs the named tool. A tool-level failure comes back as `Ok` carrying
    /// the tool's error text; only an unknown name is an error here.
    pub async fn invoke(&self, name: &str, args: Map<String, Value>) -> Result<String, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        match tool.execute(args).await {
            Ok(text) => Ok(text),
            Err(error) => {
                log::warn!("Tool '{}' reported failure: {}", name, error);
                Ok(error)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
