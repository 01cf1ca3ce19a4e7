//! Instrumentation around tool calls.
//!
//! Every tool invocation the loop performs is bracketed by
//! [`ToolCallHook::before_tool_call`] and [`ToolCallHook::after_tool_call`] and
//! recorded as a [`ToolSpan`] on the turn outcome.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// Record of a single resolved tool call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpan {
    pub trace_id: String,
    pub call_id: String,
    pub tool_name: String,
    pub arguments: Map<String, Value>,
    pub result: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

#[async_trait]
pub trait ToolCallHook: Send + Sync {
    async fn before_tool_call(
        &self,
        _trace_id: &str,
        _call_id: &str,
        _tool_name: &str,
        _arguments: &Map<String, Value>,
    ) {
    }

    async fn after_tool_call(&self, _span: &ToolSpan) {}
}

/// Logs each call at debug and each completion at info.
pub struct LoggingToolHook;

#[async_trait]
impl ToolCallHook for LoggingToolHook {
    async fn before_tool_call(
        &self,
        trace_id: &str,
        call_id: &str,
        tool_name: &str,
        arguments: &Map<String, Value>,
    ) {
        log::debug!(
            "[{}] Calling tool {} ({}) with {}",
            trace_id,
            tool_name,
            call_id,
            Value::Object(arguments.clone())
        );
    }

    async fn after_tool_call(&self, span: &ToolSpan) {
        log::info!(
            "[{}] Tool {} ({}) returned {} chars in {}ms",
            span.trace_id,
            span.tool_name,
            span.call_id,
            span.result.len(),
            span.duration_ms
        );
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Captures hook invocations in order.
    #[derive(Default)]
    pub struct RecordingHook {
        pub events: Mutex<Vec<String>>,
        pub spans: Mutex<Vec<ToolSpan>>,
    }

    #[async_trait]
    impl ToolCallHook for RecordingHook {
        async fn before_tool_call(
            &self,
            _trace_id: &str,
            call_id: &str,
            tool_name: &str,
            _arguments: &Map<String, Value>,
        ) {
            self.events
                .lock()
                .unwrap()
                .push(format!("before:{tool_name}:{call_id}"));
        }

        async fn after_tool_call(&self, span: &ToolSpan) {
            self.events
                .lock()
                .unwrap()
                .push(format!("after:{}:{}", span.tool_name, span.call_id));
            self.spans.lock().unwrap().push(span.clone());
        }
    }
}
