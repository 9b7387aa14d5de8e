use std::sync::Arc;

use crate::backend::ChatBackend;
use crate::config::ProxyConfig;
use crate::conversion::{to_chat_request, to_messages_response};
use crate::error::ProxyError;
use crate::models::messages::{MessagesRequest, MessagesResponse};
use crate::observer::ProxyObserver;

/// Runs one Messages request through the gateway: translate, call the
/// backend once, translate back.
///
/// Holds only shared read-only state, so one instance serves all requests.
#[derive(Clone)]
pub struct MessagesProxy {
    config: Arc<ProxyConfig>,
    backend: Arc<dyn ChatBackend>,
    observer: Arc<dyn ProxyObserver>,
}

impl MessagesProxy {
    pub fn new(
        config: Arc<ProxyConfig>,
        backend: Arc<dyn ChatBackend>,
        observer: Arc<dyn ProxyObserver>,
    ) -> Self {
        Self {
            config,
            backend,
            observer,
        }
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// The `stream` flag is ignored: the full envelope is always returned.
    pub async fn handle(&self, request: &MessagesRequest) -> Result<MessagesResponse, ProxyError> {
        if request.stream == Some(true) {
            tracing::debug!("streaming requested; replying with a complete message");
        }
        let observer = self.observer.as_ref();
        let chat_request = to_chat_request(request, &self.config, observer);
        let completion = self.backend.complete(&chat_request).await?;
        to_messages_response(&completion, &self.config, observer)
    }
}
