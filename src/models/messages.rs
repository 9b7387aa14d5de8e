use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Messages API role. Only the two conversational roles exist on this side;
/// system prompts travel outside the message list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One ordered unit of message content.
///
/// The `type` discriminator selects the variant; any other value fails
/// deserialization, so translators can match exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Map<String, Value>,
    },
    ToolResult {
        tool_use_id: String,
        /// Arbitrary JSON: a string, a list of parts, an object, ...
        content: Value,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }
}

/// Message content is either a plain string or an ordered list of blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

/// Tool definition as declared by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// JSON Schema for the tool input; never interpreted here.
    pub input_schema: Map<String, Value>,
}

/// Tool choice directive: `"auto"`, `"any"`, ... or an object such as
/// `{"type": "tool", "name": "lookup"}`. Forwarded as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolChoice {
    Mode(String),
    Object(Map<String, Value>),
}

impl ToolChoice {
    pub fn to_value(&self) -> Value {
        match self {
            ToolChoice::Mode(s) => Value::String(s.clone()),
            ToolChoice::Object(obj) => Value::Object(obj.clone()),
        }
    }
}

fn default_max_tokens() -> Option<u32> {
    Some(1024)
}

fn default_temperature() -> Option<f64> {
    Some(0.7)
}

fn default_tool_choice() -> Option<ToolChoice> {
    Some(ToolChoice::Mode("auto".to_string()))
}

/// Messages API request (the subset the gateway understands).
///
/// Absent `max_tokens`, `temperature` and `tool_choice` take their documented
/// defaults; an explicit `null` leaves them unset. Fields not listed here
/// (`system`, `metadata`, ...) are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagesRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: Option<u32>,
    #[serde(default = "default_temperature")]
    pub temperature: Option<f64>,
    /// Accepted for compatibility; responses are never streamed.
    #[serde(default)]
    pub stream: Option<bool>,
    #[serde(default)]
    pub tools: Option<Vec<Tool>>,
    #[serde(default = "default_tool_choice")]
    pub tool_choice: Option<ToolChoice>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    ToolUse,
    EndTurn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessagesUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Messages API response envelope.
///
/// `stop_sequence` is always serialized, as `null` when unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub id: String,
    pub model: String,
    pub role: Role,
    #[serde(rename = "type")]
    pub kind: String,
    pub content: Vec<ContentBlock>,
    pub stop_reason: StopReason,
    pub stop_sequence: Option<String>,
    pub usage: MessagesUsage,
}
