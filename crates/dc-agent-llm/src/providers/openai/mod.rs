use async_trait::async_trait;
use reqwest::Client;

use crate::provider::{LLMError, LLMProvider, LLMStream, Result};
use dc_agent_core::{Message, ToolSchema};

use super::common::openai_compat::{build_openai_compat_body, parse_openai_compat_sse_data};
use super::common::sse::llm_stream_from_sse;

/// Streaming client for any OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: Option<u32>,
}

impl OpenAIProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: None,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    async fn chat_stream(&self, messages: &[Message], tools: &[ToolSchema]) -> Result<LLMStream> {
        let body = build_openai_compat_body(&self.model, messages, tools, self.max_tokens);

        log::debug!(
            "POST {} model={} messages={} tools={}",
            self.completions_url(),
            self.model,
            messages.len(),
            tools.len()
        );

        let mut request = self.client.post(self.completions_url()).json(&body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await?;
            return Err(LLMError::Api(format!("HTTP {}: {}", status, text)));
        }

        Ok(llm_stream_from_sse(response, parse_openai_compat_sse_data))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
