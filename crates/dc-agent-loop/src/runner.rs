use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use dc_agent_core::tools::{parse_tool_arguments, ToolCall, ToolRegistry};
use dc_agent_core::{AgentError, ConversationState, Message, NextStep, ToolInvocation, TurnEvent};
use dc_agent_llm::LLMProvider;

use crate::config::AgentLoopConfig;
use crate::hooks::{LoggingToolHook, ToolCallHook, ToolSpan};
use crate::stream::handler::consume_llm_stream;
use crate::types::{TurnOutcome, TurnRequest, TurnResponse, TurnStatus};

pub type Result<T> = std::result::Result<T, AgentError>;

pub const MAX_ITERATIONS_MESSAGE: &str = "Max iterations reached. Stopping.";

const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Tool-calling agent: drives the model and the registry until the
/// conversation ends in a plain assistant answer.
pub struct DcAgent {
    llm: Arc<dyn LLMProvider>,
    registry: Arc<ToolRegistry>,
    config: AgentLoopConfig,
    hooks: Vec<Arc<dyn ToolCallHook>>,
}

impl DcAgent {
    pub fn new(
        llm: Arc<dyn LLMProvider>,
        registry: Arc<ToolRegistry>,
        config: AgentLoopConfig,
    ) -> Self {
        Self {
            llm,
            registry,
            config,
            hooks: vec![Arc::new(LoggingToolHook)],
        }
    }

    pub fn with_hook(mut self, hook: Arc<dyn ToolCallHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn config(&self) -> &AgentLoopConfig {
        &self.config
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Conversation for a new turn: configured system prompt, prior history,
    /// then the new user message.
    pub fn conversation_for(&self, history: &[Message], user_message: &str) -> ConversationState {
        let mut messages = Vec::with_capacity(history.len() + 2);
        if let Some(prompt) = self
            .config
            .system_prompt
            .as_deref()
            .filter(|prompt| !prompt.trim().is_empty())
        {
            messages.push(Message::system(prompt));
        }
        messages.extend_from_slice(history);
        messages.push(Message::user(user_message));
        ConversationState::from_messages(messages)
    }

    /// Advance `state` until it ends in a final assistant message or the
    /// model-call budget is spent.
    pub async fn run_turn(
        &self,
        state: &mut ConversationState,
        event_tx: &mpsc::Sender<TurnEvent>,
        cancel_token: &CancellationToken,
    ) -> Result<TurnOutcome> {
        let trace_id = uuid::Uuid::new_v4().to_string();
        let debug_logger = DebugLogger::new(log::log_enabled!(log::Level::Debug));
        let mut model_calls = 0usize;
        let mut tool_spans = Vec::new();

        debug_logger.log_event(
            &trace_id,
            "turn_start",
            serde_json::json!({
                "message_count": state.len(),
                "max_iterations": self.config.max_iterations,
                "tools": self.registry.len(),
            }),
        );

        loop {
            if cancel_token.is_cancelled() {
                return Err(AgentError::Cancelled);
            }

            match state.next_step() {
                NextStep::Done(output) => {
                    log::info!(
                        "[{}] Turn completed after {} model calls and {} tool calls",
                        trace_id,
                        model_calls,
                        tool_spans.len()
                    );
                    return Ok(TurnOutcome {
                        trace_id,
                        status: TurnStatus::Completed,
                        output,
                        model_calls,
                        tool_spans,
                    });
                }
                NextStep::ResolveTool(call) => {
                    let span = self
                        .resolve_tool(state, call, event_tx, cancel_token, &trace_id)
                        .await?;
                    tool_spans.push(span);
                }
                NextStep::CallModel => {
                    if model_calls >= self.config.max_iterations {
                        log::warn!(
                            "[{}] Reached {} model calls, stopping",
                            trace_id,
                            model_calls
                        );
                        state.append(Message::assistant(MAX_ITERATIONS_MESSAGE, None));
                        let _ = event_tx
                            .send(TurnEvent::Token {
                                content: MAX_ITERATIONS_MESSAGE.to_string(),
                            })
                            .await;
                        return Ok(TurnOutcome {
                            trace_id,
                            status: TurnStatus::MaxIterations,
                            output: MAX_ITERATIONS_MESSAGE.to_string(),
                            model_calls,
                            tool_spans,
                        });
                    }

                    model_calls += 1;
                    debug_logger.log_event(
                        &trace_id,
                        "model_call",
                        serde_json::json!({
                            "iteration": model_calls,
                            "message_count": state.len(),
                        }),
                    );
                    let message = self
                        .call_model(state, event_tx, cancel_token, &trace_id)
                        .await?;
                    state.append(message);
                }
            }
        }
    }

    async fn call_model(
        &self,
        state: &ConversationState,
        event_tx: &mpsc::Sender<TurnEvent>,
        cancel_token: &CancellationToken,
        trace_id: &str,
    ) -> Result<Message> {
        let timer = Timer::new("llm_request");
        let tool_schemas = self.registry.specs();
        let model_timeout = self.config.model_timeout;

        let request = self.llm.chat_stream(state.messages(), &tool_schemas);
        let response = tokio::select! {
            _ = cancel_token.cancelled() => return Err(AgentError::Cancelled),
            response = tokio::time::timeout(model_timeout, request) => response,
        };
        let stream = response
            .map_err(|_| AgentError::Timeout {
                operation: "model request".to_string(),
                limit: model_timeout,
            })?
            .map_err(|error| {
                log::error!("[{}] LLM request failed: {}", trace_id, error);
                AgentError::StreamTransport(error.to_string())
            })?;

        let output =
            consume_llm_stream(stream, event_tx, cancel_token, model_timeout, trace_id).await?;

        timer.debug(trace_id);
        log::debug!(
            "[{}] {} responded with {} text chunks and {} tool calls",
            trace_id,
            self.llm.model_name(),
            output.token_count,
            output.tool_calls.len()
        );

        Ok(Message::assistant(output.content, Some(output.tool_calls)))
    }

    async fn resolve_tool(
        &self,
        state: &mut ConversationState,
        call: ToolCall,
        event_tx: &mpsc::Sender<TurnEvent>,
        cancel_token: &CancellationToken,
        trace_id: &str,
    ) -> Result<ToolSpan> {
        let tool_name = call.function.name.clone();

        let _ = event_tx
            .send(TurnEvent::ToolCall {
                tool: ToolInvocation {
                    name: tool_name.clone(),
                    arguments: call.function.arguments.clone(),
                },
            })
            .await;

        let arguments = parse_tool_arguments(&call.function.arguments).map_err(|error| {
            log::error!(
                "[{}] Could not decode arguments for {}: {}",
                trace_id,
                tool_name,
                error.raw
            );
            error
        })?;

        if !self.registry.contains(&tool_name) {
            log::error!("[{}] Model requested unknown tool {}", trace_id, tool_name);
            return Err(AgentError::UnknownTool(tool_name));
        }

        for hook in &self.hooks {
            hook.before_tool_call(trace_id, &call.id, &tool_name, &arguments)
                .await;
        }

        let started_at = Utc::now();
        let timer = Timer::new(format!("tool {}", tool_name));
        let tool_timeout = self.config.tool_timeout;
        let span = tracing::info_span!(
            "tool_call",
            tool = %tool_name,
            call_id = %call.id,
            trace_id = %trace_id
        );
        let invocation = self
            .registry
            .invoke(&tool_name, arguments.clone())
            .instrument(span);

        let result = tokio::select! {
            _ = cancel_token.cancelled() => return Err(AgentError::Cancelled),
            result = tokio::time::timeout(tool_timeout, invocation) => result,
        };
        let result = result.map_err(|_| AgentError::Timeout {
            operation: format!("tool {}", tool_name),
            limit: tool_timeout,
        })??;

        timer.debug(trace_id);
        let tool_span = ToolSpan {
            trace_id: trace_id.to_string(),
            call_id: call.id.clone(),
            tool_name,
            arguments,
            result: result.clone(),
            started_at,
            duration_ms: u64::try_from(timer.elapsed_ms()).unwrap_or(u64::MAX),
        };

        for hook in &self.hooks {
            hook.after_tool_call(&tool_span).await;
        }

        state.append(Message::tool_result(call.id, result));
        Ok(tool_span)
    }

    /// Run one turn to completion and return the final text. `custom_inputs`
    /// is echoed back unchanged as `custom_outputs`.
    pub async fn predict(&self, request: TurnRequest) -> Result<TurnResponse> {
        let mut state = self.conversation_for(&request.history_messages(), &request.message);
        let (event_tx, event_rx) = mpsc::channel(1);
        drop(event_rx);

        let outcome = self
            .run_turn(&mut state, &event_tx, &CancellationToken::new())
            .await?;

        Ok(TurnResponse {
            output: outcome.output,
            trace_id: outcome.trace_id,
            custom_outputs: request.custom_inputs,
        })
    }

    /// Run one turn in the background and stream its events. The receiver
    /// always ends with exactly one `Done` or `Error` event.
    pub fn predict_stream(
        self: &Arc<Self>,
        request: TurnRequest,
        cancel_token: CancellationToken,
    ) -> mpsc::Receiver<TurnEvent> {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let agent = Arc::clone(self);

        tokio::spawn(async move {
            let mut state = agent.conversation_for(&request.history_messages(), &request.message);
            let turn = AssertUnwindSafe(agent.run_turn(&mut state, &event_tx, &cancel_token))
                .catch_unwind()
                .await;
            let terminal = match turn {
                Ok(Ok(outcome)) => TurnEvent::Done {
                    trace_id: outcome.trace_id,
                },
                Ok(Err(error)) => {
                    log::error!("Streaming turn failed: {}", error);
                    TurnEvent::Error {
                        error: error.to_string(),
                    }
                }
                Err(payload) => {
                    let reason = panic_reason(payload.as_ref());
                    log::error!("Streaming turn panicked: {}", reason);
                    TurnEvent::Error {
                        error: format!("Turn aborted: {}", reason),
                    }
                }
            };
            let _ = event_tx.send(terminal).await;
        });

        event_rx
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|reason| reason.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

struct DebugLogger {
    enabled: bool,
}

impl DebugLogger {
    fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    fn log_event(&self, trace_id: &str, event_type: &str, details: serde_json::Value) {
        if !self.enabled {
            return;
        }

        log::debug!("[{}] {}: {}", trace_id, event_type, details);
    }
}

struct Timer {
    name: String,
    start: std::time::Instant,
}

impl Timer {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: std::time::Instant::now(),
        }
    }

    fn elapsed_ms(&self) -> u128 {
        self.start.elapsed().as_millis()
    }

    fn debug(&self, trace_id: &str) {
        log::debug!(
            "[{}] {} completed in {}ms",
            trace_id,
            self.name,
            self.elapsed_ms()
        );
    }
}
