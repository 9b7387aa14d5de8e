//! Observability hooks invoked by the translation pipeline.
//!
//! The gateway never prints directly; it reports what it saw through a
//! [`ProxyObserver`]. Production uses [`TracingObserver`], tests can record
//! events with their own implementation.

use serde_json::{Map, Value};

use crate::models::chat::{ChatMessage, ChatUsage};

/// Maximum number of characters of message text included in log previews.
pub const PREVIEW_CHARS: usize = 500;

/// Events emitted while a request moves through the gateway.
///
/// Every method has an empty default so implementors only override what they
/// care about.
pub trait ProxyObserver: Send + Sync {
    /// A request arrived; `messages` is the flattened backend message list.
    fn on_request(&self, _requested_model: &str, _messages: &[ChatMessage]) {}

    /// A `tool_result` block was flattened. `content` is pretty-printed JSON.
    fn on_tool_result(&self, _tool_use_id: &str, _content: &str) {}

    /// The caller asked for more output tokens than the ceiling allows.
    fn on_max_tokens_capped(&self, _requested: u32, _ceiling: u32) {}

    /// The backend requested a tool invocation.
    fn on_tool_call(&self, _name: &str, _input: &Map<String, Value>) {}

    /// The backend answered with plain text (no tool calls).
    fn on_response_text(&self, _text: &str) {}

    /// Token accounting reported by the backend, `total_tokens` included.
    fn on_usage(&self, _usage: &ChatUsage) {}
}

/// Observer that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ProxyObserver for NoopObserver {}

/// Observer that emits structured `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ProxyObserver for TracingObserver {
    fn on_request(&self, requested_model: &str, messages: &[ChatMessage]) {
        tracing::info!(
            requested_model = %requested_model,
            message_count = messages.len(),
            "messages request received"
        );
        for m in messages {
            tracing::debug!(role = ?m.role, content = %preview(&m.content), "input message");
        }
    }

    fn on_tool_result(&self, tool_use_id: &str, content: &str) {
        tracing::debug!(tool_use_id = %tool_use_id, "tool result:\n{}", content);
    }

    fn on_max_tokens_capped(&self, requested: u32, ceiling: u32) {
        tracing::warn!(requested, ceiling, "capping max_tokens to backend ceiling");
    }

    fn on_tool_call(&self, name: &str, input: &Map<String, Value>) {
        let pretty = serde_json::to_string_pretty(input).unwrap_or_default();
        tracing::info!(tool = %name, "tool call:\n{}", pretty);
    }

    fn on_response_text(&self, text: &str) {
        tracing::debug!(content = %preview(text), "model output");
    }

    fn on_usage(&self, usage: &ChatUsage) {
        tracing::info!(
            input_tokens = usage.prompt_tokens,
            output_tokens = usage.completion_tokens,
            total_tokens = usage.total_tokens,
            "token usage"
        );
    }
}

/// First [`PREVIEW_CHARS`] characters of `text`, with `...` appended when cut.
pub fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
