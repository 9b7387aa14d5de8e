use axum::response::{IntoResponse, Response};
use http::StatusCode;
use thiserror::Error;

use crate::util::error_response;

/// Failures that abort a `/v1/messages` request. None of them are retried.
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("backend request failed: {0}")]
    Upstream(#[from] reqwest::Error),
    #[error("backend returned {status}: {body}")]
    UpstreamStatus { status: StatusCode, body: String },
    #[error("backend returned no choices")]
    EmptyChoices,
    #[error("tool call {id} ({name}) has malformed arguments: {source}")]
    MalformedToolArguments {
        id: String,
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::Upstream(_)
            | ProxyError::UpstreamStatus { .. }
            | ProxyError::EmptyChoices => StatusCode::BAD_GATEWAY,
            ProxyError::MalformedToolArguments { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "messages request failed");
        error_response(self.status_code(), &self.to_string())
    }
}
