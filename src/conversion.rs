use std::io;

use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::{Map, Value};

use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::models::chat;
use crate::models::messages::{
    self as msg, ContentBlock, MessageContent, MessagesResponse, MessagesUsage, StopReason,
};
use crate::observer::ProxyObserver;

/// Flatten Messages API messages into Chat Completions `{role, content}` pairs.
///
/// - String content passes through unchanged.
/// - Block content is rendered block by block and joined with `\n`:
///   `text` verbatim, `tool_use` as `[Tool Use: <name>] <input>`,
///   `tool_result` as `<tool_result><content></tool_result>`.
///
/// Each `tool_result` is also reported to `observer.on_tool_result`.
pub fn map_messages(
    src: &[msg::Message],
    observer: &dyn ProxyObserver,
) -> Vec<chat::ChatMessage> {
    src.iter()
        .map(|m| chat::ChatMessage {
            role: map_role(m.role),
            content: flatten_content(&m.content, observer),
        })
        .collect()
}

fn map_role(role: msg::Role) -> chat::Role {
    match role {
        msg::Role::User => chat::Role::User,
        msg::Role::Assistant => chat::Role::Assistant,
    }
}

fn flatten_content(content: &MessageContent, observer: &dyn ProxyObserver) -> String {
    match content {
        MessageContent::Text(s) => s.clone(),
        MessageContent::Blocks(blocks) => blocks
            .iter()
            .map(|b| render_block(b, observer))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn render_block(block: &ContentBlock, observer: &dyn ProxyObserver) -> String {
    match block {
        ContentBlock::Text { text } => text.clone(),
        ContentBlock::ToolUse { name, input, .. } => {
            format!("[Tool Use: {name}] {}", to_display_json(input))
        }
        ContentBlock::ToolResult {
            tool_use_id,
            content,
        } => {
            let pretty =
                serde_json::to_string_pretty(content).unwrap_or_else(|_| content.to_string());
            observer.on_tool_result(tool_use_id, &pretty);
            format!("<tool_result>{}</tool_result>", to_display_json(content))
        }
    }
}

/// Render JSON the way tool-using clients expect to see it inlined in text:
/// `", "` between items, `": "` after keys, non-ASCII escaped as `\uXXXX`,
/// floats in shortest round-trip form with a signed two-digit exponent outside
/// `1e-4..1e16` (`1e-07`, `1e+16`) and a trailing `.0` when integral.
///
/// Integers beyond the 64-bit range have already become floats when parsed,
/// so they render in exponent form rather than exactly.
pub fn to_display_json<T: Serialize + ?Sized>(value: &T) -> String {
    let mut out = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut out, DisplayFormatter);
    if value.serialize(&mut ser).is_err() {
        return String::new();
    }
    // The formatter only ever writes ASCII.
    String::from_utf8(out).unwrap_or_default()
}

struct DisplayFormatter;

impl Formatter for DisplayFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
    ) -> io::Result<()> {
        writer.write_all(b": ")
    }

    fn write_f64<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        value: f64,
    ) -> io::Result<()> {
        writer.write_all(float_repr(value).as_bytes())
    }

    fn write_string_fragment<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        let mut units = [0u16; 2];
        for ch in fragment.chars() {
            if (' '..='~').contains(&ch) {
                writer.write_all(&[ch as u8])?;
            } else {
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}

fn float_repr(value: f64) -> String {
    // `{:e}` yields the shortest round-trip digits, e.g. `1.25e-7`.
    let sci = format!("{:e}", value.abs());
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let sign = if value.is_sign_negative() { "-" } else { "" };

    if !(-4..16).contains(&exp) {
        let (head, tail) = digits.split_at(1);
        let frac = if tail.is_empty() {
            String::new()
        } else {
            format!(".{tail}")
        };
        let exp_sign = if exp < 0 { '-' } else { '+' };
        return format!("{sign}{head}{frac}e{exp_sign}{:02}", exp.abs());
    }

    let point = exp + 1;
    let body = if point <= 0 {
        format!("0.{}{digits}", "0".repeat(point.unsigned_abs() as usize))
    } else if point as usize >= digits.len() {
        format!("{digits}{}.0", "0".repeat(point as usize - digits.len()))
    } else {
        let (int, frac) = digits.split_at(point as usize);
        format!("{int}.{frac}")
    };
    format!("{sign}{body}")
}

/// Map Messages tool definitions onto Chat Completions function tools.
/// A missing description becomes `""`; `input_schema` is forwarded untouched.
pub fn map_tools(tools: &[msg::Tool]) -> Vec<chat::ToolDefinition> {
    tools
        .iter()
        .map(|t| chat::ToolDefinition::Function {
            function: chat::FunctionDef {
                name: t.name.clone(),
                description: t.description.clone().unwrap_or_default(),
                parameters: Value::Object(t.input_schema.clone()),
            },
        })
        .collect()
}

/// Forward the caller's tool choice verbatim. Whether the backend accepts the
/// exact shape is left to the backend.
pub fn map_tool_choice(choice: &msg::ToolChoice) -> Value {
    choice.to_value()
}

/// Output-token budget sent to the backend: the requested value, capped at
/// `ceiling`. Absent (or zero) requests get the full ceiling.
pub fn effective_max_tokens(
    requested: Option<u32>,
    ceiling: u32,
    observer: &dyn ProxyObserver,
) -> u32 {
    match requested.filter(|&n| n > 0) {
        Some(n) if n > ceiling => {
            observer.on_max_tokens_capped(n, ceiling);
            ceiling
        }
        Some(n) => n,
        None => ceiling,
    }
}

/// Build the backend request for a Messages request.
///
/// `tools` and `tool_choice` are only sent when the caller declared tools.
pub fn to_chat_request(
    src: &msg::MessagesRequest,
    config: &ProxyConfig,
    observer: &dyn ProxyObserver,
) -> chat::ChatCompletionRequest {
    let messages = map_messages(&src.messages, observer);
    observer.on_request(&src.model, &messages);

    let tools = src
        .tools
        .as_deref()
        .filter(|ts| !ts.is_empty())
        .map(map_tools);
    let tool_choice = if tools.is_some() {
        src.tool_choice.as_ref().map(map_tool_choice)
    } else {
        None
    };

    chat::ChatCompletionRequest {
        model: config.model.clone(),
        messages,
        temperature: src.temperature,
        max_tokens: effective_max_tokens(src.max_tokens, config.max_output_tokens, observer),
        tools,
        tool_choice,
    }
}

/// Convert a backend completion into a Messages API response.
///
/// Tool calls win over text: if any are present, every call becomes a
/// `tool_use` block (arguments decoded into a JSON object) and the stop reason
/// is `tool_use`. A single undecodable argument string fails the whole
/// conversion. Otherwise the text (or `""`) becomes one `text` block with stop
/// reason `end_turn`.
pub fn to_messages_response(
    completion: &chat::ChatCompletionResponse,
    config: &ProxyConfig,
    observer: &dyn ProxyObserver,
) -> Result<MessagesResponse, ProxyError> {
    let choice = completion.choices.first().ok_or(ProxyError::EmptyChoices)?;
    let message = &choice.message;

    let (content, stop_reason) = match message.tool_calls.as_deref() {
        Some(calls) if !calls.is_empty() => {
            (map_tool_calls(calls, observer)?, StopReason::ToolUse)
        }
        _ => {
            let text = message.content.clone().unwrap_or_default();
            observer.on_response_text(&text);
            (vec![ContentBlock::Text { text }], StopReason::EndTurn)
        }
    };

    let usage = completion.usage.unwrap_or_default();
    observer.on_usage(&usage);

    Ok(MessagesResponse {
        id: new_message_id(),
        model: config.qualified_model(),
        role: msg::Role::Assistant,
        kind: "message".to_string(),
        content,
        stop_reason,
        stop_sequence: None,
        usage: MessagesUsage {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
        },
    })
}

fn map_tool_calls(
    calls: &[chat::ToolCall],
    observer: &dyn ProxyObserver,
) -> Result<Vec<ContentBlock>, ProxyError> {
    calls
        .iter()
        .map(|call| {
            let input: Map<String, Value> = serde_json::from_str(&call.function.arguments)
                .map_err(|source| ProxyError::MalformedToolArguments {
                    id: call.id.clone(),
                    name: call.function.name.clone(),
                    source,
                })?;
            observer.on_tool_call(&call.function.name, &input);
            Ok(ContentBlock::ToolUse {
                id: call.id.clone(),
                name: call.function.name.clone(),
                input,
            })
        })
        .collect()
}

/// Fresh `msg_`-prefixed identifier.
pub fn new_message_id() -> String {
    format!("msg_{}", uuid::Uuid::new_v4().simple())
}
