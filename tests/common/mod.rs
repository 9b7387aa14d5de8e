#![allow(dead_code)]

pub mod upstream_stub;

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use messages2chat::chat::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ChatUsage};
use messages2chat::{ChatBackend, MessagesProxy, ProxyConfig, ProxyError, ProxyObserver};
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const TEST_MODEL: &str = "moonshotai/kimi-k2-instruct-0905";
pub const TEST_CEILING: u32 = 16384;

pub fn test_config(base_url: &str) -> Arc<ProxyConfig> {
    Arc::new(ProxyConfig {
        provider: "groq".into(),
        model: TEST_MODEL.into(),
        max_output_tokens: TEST_CEILING,
        api_key: "gsk_test_key".into(),
        base_url: base_url.trim_end_matches('/').into(),
    })
}

/// Everything a [`RecordingObserver`] saw, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Request {
        model: String,
        messages: Vec<ChatMessage>,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
    },
    Capped {
        requested: u32,
        ceiling: u32,
    },
    ToolCall {
        name: String,
        input: Map<String, Value>,
    },
    Text(String),
    Usage(ChatUsage),
}

#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Event>>,
}

impl RecordingObserver {
    fn push(&self, e: Event) {
        self.events.lock().expect("lock observer events").push(e);
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().expect("lock observer events").clone()
    }
}

impl ProxyObserver for RecordingObserver {
    fn on_request(&self, requested_model: &str, messages: &[ChatMessage]) {
        self.push(Event::Request {
            model: requested_model.to_string(),
            messages: messages.to_vec(),
        });
    }

    fn on_tool_result(&self, tool_use_id: &str, content: &str) {
        self.push(Event::ToolResult {
            tool_use_id: tool_use_id.to_string(),
            content: content.to_string(),
        });
    }

    fn on_max_tokens_capped(&self, requested: u32, ceiling: u32) {
        self.push(Event::Capped { requested, ceiling });
    }

    fn on_tool_call(&self, name: &str, input: &Map<String, Value>) {
        self.push(Event::ToolCall {
            name: name.to_string(),
            input: input.clone(),
        });
    }

    fn on_response_text(&self, text: &str) {
        self.push(Event::Text(text.to_string()));
    }

    fn on_usage(&self, usage: &ChatUsage) {
        self.push(Event::Usage(*usage));
    }
}

/// In-process backend returning canned completions and recording requests.
#[derive(Default)]
pub struct FakeBackend {
    replies: Mutex<VecDeque<Result<ChatCompletionResponse, ProxyError>>>,
    requests: Mutex<Vec<ChatCompletionRequest>>,
}

impl FakeBackend {
    pub fn replying(reply: Value) -> Self {
        let backend = Self::default();
        backend.push_reply(reply);
        backend
    }

    pub fn push_reply(&self, reply: Value) {
        let parsed = serde_json::from_value(reply).expect("valid canned completion");
        self.replies
            .lock()
            .expect("lock replies")
            .push_back(Ok(parsed));
    }

    pub fn push_error(&self, err: ProxyError) {
        self.replies.lock().expect("lock replies").push_back(Err(err));
    }

    pub fn requests(&self) -> Vec<ChatCompletionRequest> {
        self.requests.lock().expect("lock requests").clone()
    }
}

#[async_trait]
impl ChatBackend for FakeBackend {
    async fn complete(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ProxyError> {
        self.requests
            .lock()
            .expect("lock requests")
            .push(request.clone());
        self.replies
            .lock()
            .expect("lock replies")
            .pop_front()
            .expect("FakeBackend ran out of replies")
    }
}

pub fn proxy_with(backend: Arc<FakeBackend>, observer: Arc<RecordingObserver>) -> MessagesProxy {
    MessagesProxy::new(test_config("http://127.0.0.1:9/v1"), backend, observer)
}

/// Backend completion carrying plain text (or `null` content).
pub fn text_completion(text: Option<&str>) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": TEST_MODEL,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": text},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 21, "completion_tokens": 8, "total_tokens": 29}
    })
}

/// Backend completion carrying tool calls given as `(id, name, arguments)`.
pub fn tool_call_completion(calls: &[(&str, &str, &str)]) -> Value {
    let tool_calls: Vec<Value> = calls
        .iter()
        .map(|(id, name, args)| {
            json!({
                "id": id,
                "type": "function",
                "function": {"name": name, "arguments": args}
            })
        })
        .collect();
    json!({
        "id": "chatcmpl-tools",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": TEST_MODEL,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": null, "tool_calls": tool_calls},
            "finish_reason": "tool_calls"
        }],
        "usage": {"prompt_tokens": 40, "completion_tokens": 12, "total_tokens": 52}
    })
}

/// Minimal Messages API request body.
pub fn sample_messages_request() -> Value {
    json!({
        "model": "claude-sonnet-4-20250514",
        "max_tokens": 2000,
        "messages": [{"role": "user", "content": "Hello gateway"}]
    })
}

/// Messages API request with a finished tool round trip in its history.
pub fn sample_tool_history_request() -> Value {
    json!({
        "model": "claude-sonnet-4-20250514",
        "max_tokens": 999_999,
        "stream": true,
        "tools": [{
            "name": "search",
            "description": "Search the web",
            "input_schema": {
                "type": "object",
                "properties": {"q": {"type": "string"}},
                "required": ["q"]
            }
        }],
        "messages": [
            {"role": "user", "content": "Find cats"},
            {"role": "assistant", "content": [
                {"type": "text", "text": "Searching."},
                {"type": "tool_use", "id": "toolu_01", "name": "search", "input": {"q": "cats"}}
            ]},
            {"role": "user", "content": [
                {"type": "tool_result", "tool_use_id": "toolu_01", "content": {"hits": 3}}
            ]}
        ]
    })
}

/// The real gateway router served on an ephemeral port.
pub struct TestServer {
    pub base_url: String,
    pub addr: SocketAddr,
    join: JoinHandle<()>,
    client: reqwest::Client,
}

impl TestServer {
    pub async fn spawn(proxy: MessagesProxy) -> Self {
        let app = messages2chat::server::build_router(proxy);
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        let join = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {e:?}");
            }
        });
        TestServer {
            base_url: format!("http://{}", addr),
            addr,
            join,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .no_proxy()
                .build()
                .expect("failed building reqwest client"),
        }
    }

    pub async fn get(&self, path: &str) -> reqwest::Result<reqwest::Response> {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> reqwest::Result<reqwest::Response> {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.join.abort();
    }
}
