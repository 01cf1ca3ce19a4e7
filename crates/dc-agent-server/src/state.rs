use std::sync::Arc;

use actix_web::web::Bytes;
use tokio::sync::mpsc;

use dc_agent_core::TurnEvent;
use dc_agent_llm::{LLMProvider, OpenAIProvider};
use dc_agent_loop::{DcAgent, SessionManager};

use crate::config::{AssistantConfig, ConfigError};
use crate::feedback::FeedbackStore;
use crate::tools::build_registry;

#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<DcAgent>,
    pub sessions: Arc<SessionManager>,
    pub feedback: Arc<FeedbackStore>,
}

impl AppState {
    pub fn new(agent: Arc<DcAgent>) -> Self {
        let sessions = Arc::new(SessionManager::new(Arc::clone(&agent)));
        Self {
            agent,
            sessions,
            feedback: Arc::new(FeedbackStore::new()),
        }
    }

    /// Wire the OpenAI-compatible provider and the configured remote tools.
    pub fn from_config(config: &AssistantConfig) -> Result<Self, ConfigError> {
        log::info!(
            "Creating LLM provider with base URL: {} and model: {}",
            config.llm.base_url,
            config.llm.model
        );
        let llm: Arc<dyn LLMProvider> = Arc::new(
            OpenAIProvider::new(config.llm.api_key.clone())
                .with_base_url(config.llm.base_url.clone())
                .with_model(config.llm.model.clone())
                .with_max_tokens(config.llm.max_tokens),
        );

        let registry =
            build_registry(&config.tools).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        log::info!("Tool registry ready with {} tools", registry.len());

        let agent = DcAgent::new(llm, Arc::new(registry), config.agent_loop_config()?);
        Ok(Self::new(Arc::new(agent)))
    }
}

/// Forward turn events to an SSE body as `data: <json>\n\n` frames, stopping
/// after the terminal event.
pub fn spawn_sse_sender(
    mut rx: mpsc::Receiver<TurnEvent>,
    tx: mpsc::Sender<Bytes>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let event_json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(_) => continue,
            };

            let bytes = Bytes::from(format!("data: {}\n\n", event_json));
            if tx.send(bytes).await.is_err() {
                break;
            }

            if event.is_terminal() {
                break;
            }
        }
    })
}
