#![forbid(unsafe_code)]
#![doc = r#"
Messages2Chat

Accept Anthropic Messages API requests, forward them to an OpenAI-compatible Chat Completions
backend (Groq by default), and translate the completion back into a Messages response.

Crate highlights
- Library: pure conversion via `to_chat_request` / `to_messages_response`, orchestration via `MessagesProxy`.
- HTTP server (in `server`): `POST /v1/messages` (alias `/messages`), `GET /` liveness, `GET /status`.
- Models: Messages API shapes and the Chat Completions subset the backend speaks.

Modules
- `models`: Data structures for both protocols.
- `conversion`: Mapping logic Messages -> Chat and Chat -> Messages.
- `backend`: The Chat Completions call (`ChatBackend` trait, HTTP implementation).
- `proxy`: Per-request orchestration.
- `observer`: Observability hooks fired along the way.
- `server`: Axum router/handlers (the binary uses this).
- `config`, `error`, `util`: Startup configuration, error types, shared helpers.

Note: responses are never streamed; `stream: true` still yields one complete JSON message.
"#]

pub mod backend;
pub mod config;
pub mod conversion;
pub mod error;
pub mod models;
pub mod observer;
pub mod proxy;
pub mod server;
pub mod util;

pub use crate::backend::{ChatBackend, HttpChatBackend};
pub use crate::config::{Cli, ProxyConfig};
pub use crate::conversion::{to_chat_request, to_messages_response};
pub use crate::error::ProxyError;
pub use crate::observer::{NoopObserver, ProxyObserver, TracingObserver};
pub use crate::proxy::MessagesProxy;

// Re-export model namespaces for convenience (downstream users can do `use messages2chat::messages`).
pub use crate::models::{chat, messages};
