//! Mock REST backend served by axum on an ephemeral port.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use leadboard::remote::{CredentialProvider, HttpBackend};
use parking_lot::Mutex;
use url::Url;

/// One request as seen by the mock server.
#[derive(Debug, Clone)]
pub struct Seen {
    pub method: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub authorization: Option<String>,
    pub body: Option<serde_json::Value>,
}

#[derive(Clone, Default)]
pub struct RequestLog(Arc<Mutex<Vec<Seen>>>);

impl RequestLog {
    pub fn push(&self, seen: Seen) {
        self.0.lock().push(seen);
    }

    pub fn all(&self) -> Vec<Seen> {
        self.0.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }
}

pub type Responder = Arc<dyn Fn(&Seen) -> (StatusCode, String) + Send + Sync>;

#[derive(Clone)]
struct MockState {
    log: RequestLog,
    respond: Responder,
}

async fn handle(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    let seen = Seen {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: url::form_urlencoded::parse(uri.query().unwrap_or("").as_bytes())
            .into_owned()
            .collect(),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_str(&body).ok(),
    };
    let response = (state.respond)(&seen);
    state.log.push(seen);
    response
}

/// Serve a catch-all mock whose responses come from `respond`.
pub async fn spawn_mock(
    respond: impl Fn(&Seen) -> (StatusCode, String) + Send + Sync + 'static,
) -> (Url, RequestLog) {
    let log = RequestLog::default();
    let state = MockState {
        log: log.clone(),
        respond: Arc::new(respond),
    };
    let router = Router::new().fallback(handle).with_state(state);
    (spawn_server(router).await, log)
}

/// Serve `router` on 127.0.0.1 and return the API base URL (`/api/`).
pub async fn spawn_server(router: Router) -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock server");
    let addr = listener.local_addr().expect("mock server address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("mock server");
    });
    Url::parse(&format!("http://{addr}/api/")).expect("base url")
}

/// A backend for `base` that bypasses any proxy configured in the environment.
pub fn backend(base: Url, credentials: Arc<dyn CredentialProvider>) -> HttpBackend {
    let client = reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("reqwest client");
    HttpBackend::new(base, credentials).with_client(client)
}
