use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tower_http::trace::TraceLayer;

use crate::error::ProxyError;
use crate::models::messages::{MessagesRequest, MessagesResponse};
use crate::proxy::MessagesProxy;
use crate::util::cors_layer_from_env;

const ROUTES: [&str; 4] = ["/", "/status", "/v1/messages", "/messages"];

/// Build the Axum router serving the Messages API on top of `proxy`.
pub fn build_router(proxy: MessagesProxy) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/status", get(status))
        .route("/v1/messages", post(messages))
        .route("/messages", post(messages))
        .with_state(proxy)
        .layer(cors_layer_from_env())
        .layer(TraceLayer::new_for_http())
}

/// Liveness probe.
async fn root() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "Groq Anthropic Tool Proxy is alive 💡" }))
}

/// Service status: version, backend model and ceiling, available routes.
async fn status(State(proxy): State<MessagesProxy>) -> impl IntoResponse {
    let cfg = proxy.config();
    Json(serde_json::json!({
        "name": "messages2chat",
        "version": env!("CARGO_PKG_VERSION"),
        "provider": cfg.provider,
        "model": cfg.model,
        "max_output_tokens": cfg.max_output_tokens,
        "routes": ROUTES,
    }))
}

/// Translate a Messages request, call the backend, translate the reply.
/// Always a complete JSON envelope, whatever `stream` says.
async fn messages(
    State(proxy): State<MessagesProxy>,
    Json(req): Json<MessagesRequest>,
) -> Result<Json<MessagesResponse>, ProxyError> {
    proxy.handle(&req).await.map(Json)
}
