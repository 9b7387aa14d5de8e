use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};
use http::StatusCode;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// A Chat Completions backend stand-in bound to an ephemeral port.
#[derive(Clone)]
pub struct UpstreamStub {
    base_url: String,
    calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    shutdown: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub authorization: Option<String>,
    pub body: serde_json::Value,
}

#[derive(Clone)]
pub enum UpstreamReply {
    Completion(serde_json::Value),
    Error {
        status: StatusCode,
        body: serde_json::Value,
    },
}

#[derive(Clone)]
struct StubState {
    reply: UpstreamReply,
    calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl UpstreamStub {
    pub async fn start(reply: UpstreamReply) -> Self {
        let calls = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = Arc::new(StubState {
            reply,
            calls: calls.clone(),
            requests: requests.clone(),
        });

        let router = Router::new()
            .route("/v1/chat/completions", post(completions_handler))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub upstream");
        let addr = listener.local_addr().expect("stub upstream local addr");
        let (tx, rx) = oneshot::channel::<()>();

        let server = axum::serve(listener, router.into_make_service());
        tokio::spawn(async move {
            tokio::select! {
                res = server => {
                    if let Err(err) = res {
                        eprintln!("Stub upstream server error: {err:?}");
                    }
                }
                _ = rx => {}
            }
        });

        UpstreamStub {
            base_url: format!("http://{}/v1", addr),
            calls,
            requests,
            shutdown: Arc::new(Mutex::new(Some(tx))),
        }
    }

    /// Base URL to configure the gateway with (ends in `/v1`).
    pub fn url(&self) -> String {
        self.base_url.clone()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn take_requests(&self) -> Vec<RecordedRequest> {
        let mut guard = self.requests.lock().expect("lock stub requests");
        guard.drain(..).collect()
    }
}

impl Drop for UpstreamStub {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.shutdown.lock() {
            if let Some(tx) = guard.take() {
                let _ = tx.send(());
            }
        }
    }
}

async fn completions_handler(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    state.calls.fetch_add(1, Ordering::SeqCst);
    let authorization = headers
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    if let Ok(mut guard) = state.requests.lock() {
        guard.push(RecordedRequest {
            authorization,
            body,
        });
    }

    match &state.reply {
        UpstreamReply::Completion(v) => Ok(Json(v.clone())),
        UpstreamReply::Error { status, body } => Err((*status, Json(body.clone()))),
    }
}
