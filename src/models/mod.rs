//! Wire models for both sides of the gateway.
//!
//! This module groups two submodules:
//! - `messages`: the Anthropic Messages API shapes the gateway accepts and returns.
//! - `chat`: the OpenAI-compatible Chat Completions shapes sent to (and received from) the backend.
//!
//! The mapping logic between the two lives in `crate::conversion`.

pub mod chat;
pub mod messages;

// Optional convenience re-exports for downstream users.
pub use chat::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ChatUsage, FunctionDef,
    ToolCall, ToolDefinition,
};
pub use messages::{
    ContentBlock, Message, MessageContent, MessagesRequest, MessagesResponse, MessagesUsage,
    StopReason, Tool, ToolChoice,
};
