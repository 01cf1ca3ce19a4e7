//! Layered assistant configuration.
//!
//! The first source that exists wins: an explicit `--config` file (JSON, or
//! TOML by extension), `config/dc_assistant.json`, the
//! `DC_ASSISTANT_CONFIG_JSON` environment variable, and finally built-in
//! defaults. Individual environment variables are applied on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use dc_agent_loop::AgentLoopConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config/dc_assistant.json";
pub const CONFIG_JSON_ENV: &str = "DC_ASSISTANT_CONFIG_JSON";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AssistantConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub agent: AgentSettings,
    pub tools: Vec<ToolConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub max_tokens: Option<u32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:12123".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: String::new(),
            max_tokens: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentSettings {
    pub system_prompt: Option<String>,
    /// Read at startup when `system_prompt` is not set inline.
    pub system_prompt_file: Option<PathBuf>,
    pub max_iterations: usize,
    pub model_timeout_secs: u64,
    pub tool_timeout_secs: u64,
}

impl Default for AgentSettings {
    fn default() -> Self {
        let loop_defaults = AgentLoopConfig::default();
        Self {
            system_prompt: None,
            system_prompt_file: None,
            max_iterations: loop_defaults.max_iterations,
            model_timeout_secs: loop_defaults.model_timeout.as_secs(),
            tool_timeout_secs: loop_defaults.tool_timeout.as_secs(),
        }
    }
}

/// A remote function exposed to the model as a tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_parameters")]
    pub parameters: Value,
    pub endpoint: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_parameters() -> Value {
    serde_json::json!({"type": "object", "properties": {}})
}

impl AssistantConfig {
    /// Load from the process environment and working directory.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(explicit_path, Path::new(DEFAULT_CONFIG_PATH), |key| {
            std::env::var(key).ok()
        })
    }

    pub fn load_with<F>(
        explicit_path: Option<&Path>,
        default_path: &Path,
        env: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = if let Some(path) = explicit_path {
            log::info!("Loading configuration from {:?}", path);
            Self::from_path(path)?
        } else if default_path.is_file() {
            log::info!("Loading configuration from {:?}", default_path);
            Self::from_path(default_path)?
        } else if let Some(json) = env(CONFIG_JSON_ENV).filter(|json| !json.trim().is_empty()) {
            log::info!("Loading configuration from {}", CONFIG_JSON_ENV);
            serde_json::from_str(&json)?
        } else {
            log::info!("No configuration found, using defaults");
            Self::default()
        };

        config.apply_env_overrides(env)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        if is_toml {
            Ok(toml::from_str(&content)?)
        } else {
            Ok(serde_json::from_str(&content)?)
        }
    }

    fn apply_env_overrides<F>(&mut self, env: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = env("LLM_MODEL").filter(|v| !v.is_empty()) {
            self.llm.model = model;
        }
        if let Some(base_url) = env("LLM_BASE_URL").filter(|v| !v.is_empty()) {
            self.llm.base_url = base_url;
        }
        if let Some(api_key) = env("LLM_API_KEY") {
            self.llm.api_key = api_key;
        }
        if let Some(raw) = env("DC_MAX_ITERATIONS").filter(|v| !v.is_empty()) {
            self.agent.max_iterations = raw.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("DC_MAX_ITERATIONS must be a number, got {raw:?}"))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.max_iterations == 0 {
            return Err(ConfigError::Invalid(
                "agent.max_iterations must be at least 1".to_string(),
            ));
        }
        if self.llm.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("llm.base_url is empty".to_string()));
        }
        for tool in &self.tools {
            if tool.name.trim().is_empty() {
                return Err(ConfigError::Invalid("tool name cannot be empty".to_string()));
            }
            if tool.endpoint.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "tool {} has no endpoint",
                    tool.name
                )));
            }
        }
        Ok(())
    }

    /// Inline prompt, else the contents of `system_prompt_file`.
    pub fn system_prompt(&self) -> Result<Option<String>, ConfigError> {
        if let Some(prompt) = self
            .agent
            .system_prompt
            .as_ref()
            .filter(|prompt| !prompt.trim().is_empty())
        {
            return Ok(Some(prompt.clone()));
        }

        match &self.agent.system_prompt_file {
            Some(path) => std::fs::read_to_string(path)
                .map(Some)
                .map_err(|source| ConfigError::Io {
                    path: path.clone(),
                    source,
                }),
            None => Ok(None),
        }
    }

    pub fn agent_loop_config(&self) -> Result<AgentLoopConfig, ConfigError> {
        Ok(AgentLoopConfig {
            max_iterations: self.agent.max_iterations,
            system_prompt: self.system_prompt()?,
            model_timeout: Duration::from_secs(self.agent.model_timeout_secs),
            tool_timeout: Duration::from_secs(self.agent.tool_timeout_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn missing_default(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("dc_assistant.json")
    }

    #[test]
    fn defaults_when_nothing_is_configured() {
        let dir = tempfile::tempdir().unwrap();
        let config = AssistantConfig::load_with(None, &missing_default(&dir), no_env).unwrap();

        assert_eq!(config, AssistantConfig::default());
        assert_eq!(config.agent.max_iterations, 20);
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn default_file_takes_precedence_over_env_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dc_assistant.json");
        std::fs::write(&path, r#"{"llm": {"model": "from-file"}}"#).unwrap();

        let config = AssistantConfig::load_with(None, &path, |key| {
            (key == CONFIG_JSON_ENV).then(|| r#"{"llm": {"model": "from-env"}}"#.to_string())
        })
        .unwrap();

        assert_eq!(config.llm.model, "from-file");
    }

    #[test]
    fn env_json_used_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = AssistantConfig::load_with(None, &missing_default(&dir), |key| {
            (key == CONFIG_JSON_ENV).then(|| {
                r#"{"tools": [{"name": "screen_play_tendencies", "endpoint": "http://fn/screen"}]}"#
                    .to_string()
            })
        })
        .unwrap();

        assert_eq!(config.tools.len(), 1);
        assert_eq!(config.tools[0].parameters["type"], "object");
    }

    #[test]
    fn individual_env_vars_override_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dc_assistant.json");
        std::fs::write(
            &path,
            r#"{"llm": {"model": "file-model"}, "agent": {"max_iterations": 5}}"#,
        )
        .unwrap();

        let config = AssistantConfig::load_with(Some(&path), &missing_default(&dir), |key| {
            match key {
                "LLM_MODEL" => Some("env-model".to_string()),
                "DC_MAX_ITERATIONS" => Some("7".to_string()),
                _ => None,
            }
        })
        .unwrap();

        assert_eq!(config.llm.model, "env-model");
        assert_eq!(config.agent.max_iterations, 7);
    }

    #[test]
    fn toml_file_is_detected_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9100

[agent]
system_prompt = "You are a defensive coordinator's analyst."

[[tools]]
name = "tendencies_by_down_distance"
endpoint = "http://localhost:9000/fn/tendencies_by_down_distance"
"#
        )
        .unwrap();

        let config = AssistantConfig::from_path(file.path()).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.tools[0].name, "tendencies_by_down_distance");
        assert_eq!(
            config.system_prompt().unwrap().as_deref(),
            Some("You are a defensive coordinator's analyst.")
        );
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = AssistantConfig::load_with(
            Some(&dir.path().join("absent.json")),
            &missing_default(&dir),
            no_env,
        );
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = AssistantConfig::load_with(None, &missing_default(&dir), |key| {
            (key == "DC_MAX_ITERATIONS").then(|| "many".to_string())
        });
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        let result = AssistantConfig::load_with(None, &missing_default(&dir), |key| {
            (key == CONFIG_JSON_ENV).then(|| r#"{"agent": {"max_iterations": 0}}"#.to_string())
        });
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        let result = AssistantConfig::load_with(None, &missing_default(&dir), |key| {
            (key == CONFIG_JSON_ENV).then(|| "{not json".to_string())
        });
        assert!(matches!(result, Err(ConfigError::Json(_))));
    }

    #[test]
    fn system_prompt_file_is_read_when_inline_prompt_missing() {
        let dir = tempfile::tempdir().unwrap();
        let prompt_path = dir.path().join("prompt.txt");
        std::fs::write(&prompt_path, "Answer with formations and percentages.").unwrap();

        let mut config = AssistantConfig::default();
        config.agent.system_prompt_file = Some(prompt_path);
        config.agent.tool_timeout_secs = 5;

        let loop_config = config.agent_loop_config().unwrap();
        assert_eq!(
            loop_config.system_prompt.as_deref(),
            Some("Answer with formations and percentages.")
        );
        assert_eq!(loop_config.tool_timeout, Duration::from_secs(5));
    }
}
