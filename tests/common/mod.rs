//! Shared test utilities for integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use runagent::client::{HttpRequest, HttpResponse, HttpTransport, StreamConnection, StreamTransport};
use runagent::{ClientBuilder, ClientConfig, RunAgentClient, RunAgentError, RunAgentResult};
use serde_json::{json, Value};

/// Scripted agent server: fixed architecture, run response and stream frames.
pub struct MockAgent {
    pub agent_id: String,
    pub architecture_status: u16,
    pub architecture_body: Value,
    pub run_status: u16,
    pub run_body: Value,
    pub stream_frames: Vec<String>,
    pub required_token: Option<String>,
    pub recorded: Mutex<Recorded>,
}

/// What the mock server saw.
#[derive(Debug, Default, Clone)]
pub struct Recorded {
    pub architecture_hits: usize,
    pub run_bodies: Vec<Value>,
    pub authorization: Vec<Option<String>>,
    pub user_agents: Vec<Option<String>>,
    pub stream_requests: Vec<Value>,
    pub stream_tokens: Vec<Option<String>>,
    pub stream_sessions_ended: usize,
}

impl MockAgent {
    /// Agent `a1` exposing `tags`.
    pub fn new(tags: &[&str]) -> Self {
        let entrypoints: Vec<Value> = tags
            .iter()
            .map(|tag| json!({"tag": tag, "file": "main.py", "module": tag}))
            .collect();
        Self {
            agent_id: "a1".to_string(),
            architecture_status: 200,
            architecture_body: json!({"agent_id": "a1", "entrypoints": entrypoints}),
            run_status: 200,
            run_body: json!({"success": true, "data": null}),
            stream_frames: Vec::new(),
            required_token: None,
            recorded: Mutex::new(Recorded::default()),
        }
    }

    pub fn architecture(mut self, status: u16, body: Value) -> Self {
        self.architecture_status = status;
        self.architecture_body = body;
        self
    }

    pub fn run_response(mut self, status: u16, body: Value) -> Self {
        self.run_status = status;
        self.run_body = body;
        self
    }

    pub fn stream(mut self, frames: Vec<String>) -> Self {
        self.stream_frames = frames;
        self
    }

    /// Reject stream handshakes without `?token={token}`.
    pub fn require_token(mut self, token: &str) -> Self {
        self.required_token = Some(token.to_string());
        self
    }

    pub fn recorded(&self) -> Recorded {
        self.recorded.lock().unwrap().clone()
    }
}

/// A running mock server.
pub struct MockServer {
    pub port: u16,
    pub base_url: String,
    pub agent: Arc<MockAgent>,
    pub handle: tokio::task::JoinHandle<()>,
}

/// Start `agent` on a random port.
pub async fn start_mock_agent(agent: MockAgent) -> MockServer {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let agent = Arc::new(agent);

    let app = Router::new()
        .route("/api/v1/health", get(|| async { Json(json!({"status": "ok"})) }))
        .route("/api/v1/agents/{agent_id}/architecture", get(architecture))
        .route("/api/v1/agents/{agent_id}/run", post(run))
        .route("/api/v1/agents/{agent_id}/run-stream", get(run_stream))
        .with_state(agent.clone());

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Brief wait for the server to start accepting connections.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    MockServer {
        port: addr.port(),
        base_url: format!("http://{addr}"),
        agent,
        handle,
    }
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn architecture(
    State(agent): State<Arc<MockAgent>>,
    Path(agent_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    {
        let mut rec = agent.recorded.lock().unwrap();
        rec.architecture_hits += 1;
        rec.authorization.push(header(&headers, "authorization"));
    }
    if agent_id != agent.agent_id {
        return (StatusCode::NOT_FOUND, Json(json!({"detail": "Agent not found"}))).into_response();
    }
    (status(agent.architecture_status), Json(agent.architecture_body.clone())).into_response()
}

async fn run(
    State(agent): State<Arc<MockAgent>>,
    Path(_agent_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    {
        let mut rec = agent.recorded.lock().unwrap();
        rec.run_bodies.push(body);
        rec.authorization.push(header(&headers, "authorization"));
        rec.user_agents.push(header(&headers, "user-agent"));
    }
    (status(agent.run_status), Json(agent.run_body.clone())).into_response()
}

async fn run_stream(
    ws: WebSocketUpgrade,
    State(agent): State<Arc<MockAgent>>,
    Path(_agent_id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let token = query.get("token").cloned();
    if let Some(expected) = &agent.required_token {
        if token.as_ref() != Some(expected) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
    }
    ws.on_upgrade(move |socket| serve_stream(socket, agent, token))
}

async fn serve_stream(mut socket: WebSocket, agent: Arc<MockAgent>, token: Option<String>) {
    if let Some(Ok(Message::Text(text))) = socket.recv().await {
        let request = serde_json::from_str(text.as_str()).unwrap_or(Value::Null);
        let mut rec = agent.recorded.lock().unwrap();
        rec.stream_requests.push(request);
        rec.stream_tokens.push(token);
    }

    for frame in &agent.stream_frames {
        if socket.send(Message::Text(frame.clone().into())).await.is_err() {
            break;
        }
    }

    // Hold the connection open until the client goes away.
    while let Some(Ok(message)) = socket.recv().await {
        if let Message::Close(_) = message {
            break;
        }
    }
    agent.recorded.lock().unwrap().stream_sessions_ended += 1;
}

// ============================================================================
// Frames
// ============================================================================

pub fn data_frame(payload: Value) -> String {
    json!({"type": "data", "payload": payload}).to_string()
}

pub fn status_frame(status: &str) -> String {
    json!({"type": "status", "status": status}).to_string()
}

pub fn error_frame(code: &str, message: &str) -> String {
    json!({"type": "error", "error": {"code": code, "message": message}}).to_string()
}

// ============================================================================
// Clients
// ============================================================================

/// Local-mode config pointing at `server`.
pub fn local_config(server: &MockServer, tag: &str) -> ClientConfig {
    ClientConfig::new("a1", tag)
        .local(true)
        .host("127.0.0.1")
        .port(server.port)
}

/// Remote-mode config pointing at `server`.
pub fn remote_config(server: &MockServer, tag: &str, api_key: &str) -> ClientConfig {
    ClientConfig::new("a1", tag)
        .base_url(server.base_url.clone())
        .api_key(api_key)
}

/// Client with the default transports and an empty environment.
pub fn client(config: ClientConfig) -> RunAgentClient {
    ClientBuilder::new(config)
        .with_env(HashMap::<String, String>::new())
        .build()
        .unwrap()
}

// ============================================================================
// Mock transports
// ============================================================================

/// HTTP transport that counts calls and never reaches a network.
#[derive(Default)]
pub struct CountingHttp {
    pub calls: AtomicUsize,
}

#[async_trait]
impl HttpTransport for CountingHttp {
    async fn send(&self, _request: HttpRequest) -> RunAgentResult<HttpResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RunAgentError::connection("offline"))
    }
}

/// Stream transport that counts connection attempts and opened/closed
/// connections, delegating to `inner` when one is set.
#[derive(Default)]
pub struct CountingStream {
    pub inner: Option<Arc<dyn StreamTransport>>,
    pub connects: AtomicUsize,
    pub closes: Arc<AtomicUsize>,
}

impl CountingStream {
    pub fn wrapping(inner: Arc<dyn StreamTransport>) -> Self {
        Self {
            inner: Some(inner),
            ..Self::default()
        }
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StreamTransport for CountingStream {
    async fn connect(&self, url: &str) -> RunAgentResult<Box<dyn StreamConnection>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let Some(inner) = &self.inner else {
            return Err(RunAgentError::connection("offline"));
        };
        let connection = inner.connect(url).await?;
        Ok(Box::new(CountingConnection {
            inner: connection,
            closes: self.closes.clone(),
        }))
    }
}

struct CountingConnection {
    inner: Box<dyn StreamConnection>,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl StreamConnection for CountingConnection {
    async fn send_text(&mut self, text: String) -> RunAgentResult<()> {
        self.inner.send_text(text).await
    }

    async fn next_text(&mut self) -> Option<RunAgentResult<String>> {
        self.inner.next_text().await
    }

    async fn close(&mut self) -> RunAgentResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.inner.close().await
    }
}

/// Install a test subscriber once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
