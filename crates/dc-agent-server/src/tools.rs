//! Remote function tools backed by configured HTTP endpoints.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use dc_agent_core::tools::{RegistryError, Tool, ToolRegistry};

use crate::config::ToolConfig;

/// Posts the decoded arguments as a JSON object to `endpoint` and hands the
/// response body back to the model as text.
///
/// Transport failures and non-2xx statuses come back as `Err` text, which the
/// registry passes to the model as the tool result.
pub struct HttpFunctionTool {
    name: String,
    description: String,
    parameters: Value,
    endpoint: String,
    headers: HashMap<String, String>,
    client: reqwest::Client,
}

impl HttpFunctionTool {
    pub fn new(config: ToolConfig, client: reqwest::Client) -> Self {
        Self {
            name: config.name,
            description: config.description,
            parameters: config.parameters,
            endpoint: config.endpoint,
            headers: config.headers,
            client,
        }
    }
}

#[async_trait]
impl Tool for HttpFunctionTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Value {
        self.parameters.clone()
    }

    async fn execute(&self, args: Map<String, Value>) -> Result<String, String> {
        let mut request = self.client.post(&self.endpoint).json(&Value::Object(args));
        for (key, value) in &self.headers {
            request = request.header(key.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| format!("ERROR: {} request failed: {}", self.name, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| format!("ERROR: {} response unreadable: {}", self.name, e))?;

        if !status.is_success() {
            return Err(format!("ERROR: {} returned HTTP {}: {}", self.name, status, body));
        }

        Ok(body)
    }
}

/// Build a registry holding one [`HttpFunctionTool`] per configured tool, in
/// configuration order.
pub fn build_registry(tools: &[ToolConfig]) -> Result<ToolRegistry, RegistryError> {
    let client = reqwest::Client::new();
    let mut registry = ToolRegistry::new();

    for tool in tools {
        registry.register_shared(Arc::new(HttpFunctionTool::new(tool.clone(), client.clone())))?;
        log::info!("Registered tool {} -> {}", tool.name, tool.endpoint);
    }

    Ok(registry)
}
