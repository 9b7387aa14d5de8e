use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::models::chat::{ChatCompletionRequest, ChatCompletionResponse};

/// A Chat Completions endpoint. One call per inbound request, no retries.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ProxyError>;
}

/// Backend reached over HTTP at `{base_url}/chat/completions` with bearer auth.
pub struct HttpChatBackend {
    client: reqwest::Client,
    config: Arc<ProxyConfig>,
}

impl HttpChatBackend {
    pub fn new(client: reqwest::Client, config: Arc<ProxyConfig>) -> Self {
        Self { client, config }
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn complete(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ProxyError> {
        let url = self.url();
        tracing::debug!(
            url = %url,
            model = %request.model,
            max_tokens = request.max_tokens,
            tools = request.tools.as_ref().map_or(0, Vec::len),
            "sending chat completion request"
        );

        let resp = self
            .client
            .post(&url)
            .header(http::header::CONTENT_TYPE, "application/json")
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProxyError::UpstreamStatus { status, body });
        }

        Ok(resp.json::<ChatCompletionResponse>().await?)
    }
}
