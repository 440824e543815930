//! SSE-with-side-channel-POST transport (spec §4.2).
//!
//! Grounded on `turbomcp-http`'s `StreamableHttpClient::sse_connection_task`
//! and `process_sse_event` (`turbomcp-http/src/transport.rs`), generalized
//! from that crate's 2025-11-25 streamable-first design back to the
//! classic two-channel shape: a GET stream carries responses, a POST
//! endpoint (discovered via the stream's `endpoint` event) carries
//! requests.
//!
//! Because this is a native HTTP client rather than a browser `EventSource`,
//! the spec's "custom headers trigger a streaming-fetch fallback" nuance
//! collapses: headers are always sent directly on the GET request, so there
//! is exactly one code path rather than two.

use async_trait::async_trait;
use inspector_auth::{AuthApplier, PendingRequest};
use inspector_core::{AuthConfig, ConnectStage, Error, Result};
use reqwest::Client as HttpClient;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex, RwLock};
use url::Url;

use crate::traits::{Transport, TransportEvent};

/// How long the handshake waits for an `endpoint` announcement before
/// failing with `ConnectStage::SseEndpointAnnounce` (spec §4.2 step 2).
const ENDPOINT_ANNOUNCE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SseState {
    Idle,
    AwaitingEndpoint,
    Ready,
    Closed,
}

/// SSE transport: a GET-streamed response channel paired with a POST
/// request channel whose URL is discovered from the stream.
pub struct SseTransport {
    http: HttpClient,
    host: String,
    path: String,
    auth: AuthConfig,
    user_headers: HashMap<String, String>,
    state: Arc<Mutex<SseState>>,
    message_endpoint: Arc<RwLock<Option<String>>>,
    session_id: Arc<RwLock<Option<String>>>,
    protocol_version: RwLock<Option<String>>,
    inbound_tx: mpsc::Sender<TransportEvent>,
    inbound_rx: Mutex<mpsc::Receiver<TransportEvent>>,
    reader_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl std::fmt::Debug for SseTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SseTransport")
            .field("host", &self.host)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SseTransport {
    pub fn new(
        host: impl Into<String>,
        path: impl Into<String>,
        auth: AuthConfig,
        user_headers: HashMap<String, String>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(256);
        Self {
            http: HttpClient::new(),
            host: host.into(),
            path: path.into(),
            auth,
            user_headers,
            state: Arc::new(Mutex::new(SseState::Idle)),
            message_endpoint: Arc::new(RwLock::new(None)),
            session_id: Arc::new(RwLock::new(None)),
            protocol_version: RwLock::new(None),
            inbound_tx: tx,
            inbound_rx: Mutex::new(rx),
            reader_task: Mutex::new(None),
        }
    }

    /// Build the initial GET request: `host+path`, with auth's URL-query
    /// and header additions already folded in (spec §4.2 step 1).
    fn stream_request(&self) -> Result<PendingRequest> {
        let url = Url::parse(&format!(
            "{}{}",
            self.host.trim_end_matches('/'),
            if self.path.starts_with('/') {
                self.path.clone()
            } else {
                format!("/{}", self.path)
            }
        ))
        .map_err(|e| Error::connect(ConnectStage::Dns, e.to_string()))?;
        let mut req = PendingRequest::new(url);
        req.headers = self.user_headers.clone();
        AuthApplier::new().apply(&self.auth, &mut req);
        Ok(req)
    }

    /// Resolve the announced endpoint against `host`, honoring both
    /// absolute and root-relative forms (spec §4.2 step 2, §4.3 "message
    /// URL").
    fn resolve_message_url(&self, announced: &str) -> Result<Url> {
        let url = if announced.starts_with("http://") || announced.starts_with("https://") {
            Url::parse(announced).map_err(|e| Error::Transport(e.to_string()))?
        } else {
            let joined = format!("{}{}", self.host.trim_end_matches('/'), announced);
            Url::parse(&joined).map_err(|e| Error::Transport(e.to_string()))?
        };
        Ok(url)
    }

    async fn spawn_reader(&self, response: reqwest::Response, ready_tx: oneshot::Sender<Result<()>>) {
        let inbound_tx = self.inbound_tx.clone();
        let message_endpoint = Arc::clone(&self.message_endpoint);
        let session_id = Arc::clone(&self.session_id);
        let state = Arc::clone(&self.state);

        let handle = tokio::spawn(async move {
            use futures::StreamExt;
            let mut ready_tx = Some(ready_tx);
            let mut byte_stream = response.bytes_stream();
            let mut buffer = String::new();
            let mut event_type: Option<String> = None;
            let mut event_data: Vec<String> = Vec::new();

            loop {
                let chunk = match byte_stream.next().await {
                    Some(Ok(bytes)) => bytes,
                    Some(Err(e)) => {
                        tracing::warn!("SSE stream read error: {e}");
                        break;
                    }
                    None => break,
                };
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                while let Some(newline_pos) = buffer.find('\n') {
                    let line = buffer[..newline_pos].trim_end_matches('\r').to_string();
                    buffer.drain(..=newline_pos);

                    if line.is_empty() {
                        if event_data.is_empty() {
                            event_type = None;
                            continue;
                        }
                        let data = event_data.join("\n");
                        event_data.clear();
                        let etype = event_type.take();
                        dispatch_event(
                            etype,
                            data,
                            &message_endpoint,
                            &session_id,
                            &state,
                            &inbound_tx,
                            &mut ready_tx,
                        )
                        .await;
                        continue;
                    }
                    if let Some(rest) = line.strip_prefix("event:") {
                        event_type = Some(rest.trim_start().to_string());
                    } else if let Some(rest) = line.strip_prefix("data:") {
                        event_data.push(rest.trim_start().to_string());
                    }
                }
            }

            if let Some(tx) = ready_tx.take() {
                let _ = tx.send(Err(Error::connect(
                    ConnectStage::SseEndpointAnnounce,
                    "stream closed before endpoint announcement",
                )));
            }
            *state.lock().await = SseState::Closed;
            let _ = inbound_tx.send(TransportEvent::Closed).await;
        });

        *self.reader_task.lock().await = Some(handle);
    }
}

#[allow(clippy::too_many_arguments)]
async fn dispatch_event(
    event_type: Option<String>,
    data: String,
    message_endpoint: &Arc<RwLock<Option<String>>>,
    session_id: &Arc<RwLock<Option<String>>>,
    state: &Arc<Mutex<SseState>>,
    inbound_tx: &mpsc::Sender<TransportEvent>,
    ready_tx: &mut Option<oneshot::Sender<Result<()>>>,
) {
    // Only a frame received while still awaiting the endpoint announcement
    // can BE that announcement — once the handshake has completed, a
    // regular JSON-RPC response is free to contain the substrings
    // "session_id=" or "sessionId=" (e.g. echoing a callback URL) without
    // being mistaken for a second announcement and dropped.
    let still_awaiting = *state.lock().await == SseState::AwaitingEndpoint;
    let is_announcement = still_awaiting
        && (event_type.as_deref() == Some("endpoint")
            || data.contains("session_id=")
            || data.contains("sessionId="));

    if is_announcement {
        *state.lock().await = SseState::Ready;
        *message_endpoint.write().await = Some(data.trim().to_string());
        *session_id.write().await = extract_session_id(&data);
        if let Some(tx) = ready_tx.take() {
            let _ = tx.send(Ok(()));
        }
        return;
    }

    if data.trim() == "ping" {
        return;
    }
    if data.trim().is_empty() {
        return;
    }

    match serde_json::from_str::<Value>(&data) {
        Ok(value) => {
            let _ = inbound_tx.send(TransportEvent::Message(value)).await;
        }
        Err(e) => tracing::warn!("SSE data frame was not valid JSON: {e}"),
    }
}

/// Extract a session identifier from a `session_id=<token>` or
/// `sessionId=<token>` fragment; hex digits and hyphens are the token
/// alphabet (spec §6 "SSE transport").
fn extract_session_id(data: &str) -> Option<String> {
    for marker in ["session_id=", "sessionId="] {
        if let Some(pos) = data.find(marker) {
            let start = pos + marker.len();
            let token: String = data[start..]
                .chars()
                .take_while(|c| c.is_ascii_hexdigit() || *c == '-')
                .collect();
            if !token.is_empty() {
                return Some(token);
            }
        }
    }
    None
}

#[async_trait]
impl Transport for SseTransport {
    async fn start(&self) -> Result<()> {
        {
            let mut s = self.state.lock().await;
            if *s != SseState::Idle {
                return Ok(());
            }
            *s = SseState::AwaitingEndpoint;
        }

        let req = self.stream_request()?;
        let mut builder = self
            .http
            .get(req.url)
            .header("Accept", "text/event-stream");
        for (name, value) in &req.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::connect(ConnectStage::Tcp, e.to_string()))?;
        if !response.status().is_success() {
            return Err(Error::connect(
                ConnectStage::SseEndpointAnnounce,
                format!("SSE stream returned status {}", response.status()),
            ));
        }

        let (ready_tx, ready_rx) = oneshot::channel();
        self.spawn_reader(response, ready_tx).await;

        match tokio::time::timeout(ENDPOINT_ANNOUNCE_TIMEOUT, ready_rx).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(e))) => Err(e),
            Ok(Err(_)) => Err(Error::connect(
                ConnectStage::SseEndpointAnnounce,
                "reader task dropped before announcing endpoint",
            )),
            Err(_) => Err(Error::connect(
                ConnectStage::SseEndpointAnnounce,
                "no endpoint announcement within timeout",
            )),
        }
    }

    async fn send(&self, message: Value) -> Result<()> {
        if *self.state.lock().await != SseState::Ready {
            return Err(Error::Transport("SSE transport not ready".to_string()));
        }
        let announced = self
            .message_endpoint
            .read()
            .await
            .clone()
            .ok_or_else(|| Error::Transport("no message endpoint discovered".to_string()))?;
        let url = self.resolve_message_url(&announced)?;

        let mut req = PendingRequest::new(url);
        req.headers = self.user_headers.clone();
        AuthApplier::new().apply(&self.auth, &mut req);

        let mut builder = self
            .http
            .post(req.url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .json(&message);
        for (name, value) in &req.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        let status = response.status();
        if status.as_u16() == 202 {
            return Ok(());
        }
        if !status.is_success() {
            return Err(Error::Transport(format!("POST failed with status {status}")));
        }

        let text = response.text().await.unwrap_or_default();
        if text.trim() == "\"Accepted\"" || text.trim() == "Accepted" {
            return Ok(());
        }
        if text.trim().is_empty() {
            return Ok(());
        }
        let value: Value = serde_json::from_str(&text)?;
        let _ = self.inbound_tx.send(TransportEvent::Message(value)).await;
        Ok(())
    }

    async fn receive(&self) -> Result<TransportEvent> {
        let mut rx = self.inbound_rx.lock().await;
        match rx.recv().await {
            Some(event) => Ok(event),
            None => Ok(TransportEvent::Closed),
        }
    }

    async fn close(&self) -> Result<()> {
        *self.state.lock().await = SseState::Closed;
        if let Some(handle) = self.reader_task.lock().await.take() {
            handle.abort();
        }
        Ok(())
    }

    fn session_id(&self) -> Option<String> {
        self.session_id.try_read().ok().and_then(|g| g.clone())
    }

    fn set_protocol_version(&self, version: &str) {
        if let Ok(mut guard) = self.protocol_version.try_write() {
            *guard = Some(version.to_string());
        }
    }
}
