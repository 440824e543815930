//! JSON-RPC request/response correlation, the `initialize` handshake, and
//! the enumeration/invocation methods (spec §4.4).
//!
//! Grounded on `turbomcp-client`'s `MessageDispatcher`
//! (`turbomcp-client/src/client/dispatcher.rs`): a single background task
//! is the sole reader of `Transport::receive()` and routes inbound frames
//! to `oneshot` channels keyed by request ID. This crate collapses the
//! dispatcher/protocol-client split the teacher has (`dispatcher.rs` +
//! `client/protocol.rs`) into one `ProtocolClient`, since this spec has no
//! server-initiated requests to route to a second handler.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use inspector_core::{ArtifactKind, Error, MessageId, Result};
use inspector_transport::{Transport, TransportEvent};
use serde_json::{json, Value};
use tokio::sync::{oneshot, Mutex, RwLock};

use crate::jsonrpc::{classify, FrameKind, JsonRpcRequest, JsonRpcResponse};

/// Default timeout for `tools/list`-shaped calls and the `initialize`
/// handshake (spec §4.4).
pub const LIST_TIMEOUT: Duration = Duration::from_secs(10);
/// Default timeout for `tools/call`-shaped invocations (spec §4.4).
pub const INVOKE_TIMEOUT: Duration = Duration::from_secs(30);

const PROTOCOL_VERSION: &str = "2024-11-05";

/// The cached result of a successful `initialize` handshake.
#[derive(Debug, Clone)]
pub struct InitializeResult {
    pub protocol_version: String,
    pub capabilities: Value,
    pub server_info: Value,
}

/// Observes every successful invocation (`tools/call`, `resources/read`,
/// `prompts/get`) so `inspector-scan`'s `PassiveMonitor` can run detection
/// over live traffic without `inspector-protocol` depending on it (spec
/// §4.4's "every invocation, on success, invokes `PassiveMonitor.observe`").
#[async_trait]
pub trait InvocationObserver: Send + Sync {
    async fn observe(
        &self,
        kind: ArtifactKind,
        target_name: &str,
        params: &Value,
        result: &Value,
        uri: Option<&str>,
    );
}

type PendingMap = Arc<Mutex<HashMap<String, oneshot::Sender<JsonRpcResponse>>>>;

/// A JSON-RPC 2.0 client layered over any [`Transport`].
pub struct ProtocolClient<T: Transport> {
    transport: Arc<T>,
    pending: PendingMap,
    next_id: AtomicI64,
    init_result: RwLock<Option<InitializeResult>>,
    observer: RwLock<Option<Arc<dyn InvocationObserver>>>,
    reader_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl<T: Transport + 'static> ProtocolClient<T> {
    pub fn new(transport: Arc<T>) -> Arc<Self> {
        Arc::new(Self {
            transport,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicI64::new(1),
            init_result: RwLock::new(None),
            observer: RwLock::new(None),
            reader_task: Mutex::new(None),
        })
    }

    /// Register the observer notified on every successful invocation.
    pub async fn set_observer(&self, observer: Arc<dyn InvocationObserver>) {
        *self.observer.write().await = Some(observer);
    }

    /// Start the transport and the background routing task. Must be called
    /// before any request is sent.
    pub async fn connect(self: &Arc<Self>) -> Result<()> {
        self.transport.start().await?;
        self.spawn_reader();
        Ok(())
    }

    fn spawn_reader(self: &Arc<Self>) {
        let transport = Arc::clone(&self.transport);
        let pending = Arc::clone(&self.pending);
        let this = Arc::clone(self);
        let handle = tokio::spawn(async move {
            loop {
                match transport.receive().await {
                    Ok(TransportEvent::Message(value)) => {
                        this.route_message(&pending, value).await;
                    }
                    Ok(TransportEvent::Closed) => {
                        tracing::info!("transport closed, routing task exiting");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!("transport receive error: {e}");
                        break;
                    }
                }
            }
            Self::fail_all_pending(&pending).await;
        });
        // The lock is only briefly held and never across an await point
        // that could deadlock with this same task, so a blocking attempt
        // is safe here.
        if let Ok(mut guard) = self.reader_task.try_lock() {
            *guard = Some(handle);
        }
    }

    async fn fail_all_pending(pending: &PendingMap) {
        let mut map = pending.lock().await;
        for (_, tx) in map.drain() {
            drop(tx);
        }
    }

    async fn route_message(self: &Arc<Self>, pending: &PendingMap, value: Value) {
        match classify(&value) {
            FrameKind::Response => {
                let Ok(response) = serde_json::from_value::<JsonRpcResponse>(value) else {
                    tracing::warn!("received malformed JSON-RPC response");
                    return;
                };
                let Some(id) = &response.id else {
                    tracing::warn!("received response with null id");
                    return;
                };
                let key = id.correlation_key();
                let sender = pending.lock().await.remove(&key);
                match sender {
                    Some(tx) => {
                        let _ = tx.send(response);
                    }
                    None => tracing::warn!(id = %id, "response for unknown or expired request id"),
                }
            }
            FrameKind::Request | FrameKind::Notification => {
                tracing::debug!("ignoring server-initiated frame (no bidirectional handler)");
            }
        }
    }

    fn allocate_id(&self) -> MessageId {
        MessageId::Number(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Send a request and await its correlated response within `timeout`.
    async fn request(&self, method: &str, params: Option<Value>, timeout: Duration) -> Result<Value> {
        let id = self.allocate_id();
        let key = id.correlation_key();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(key.clone(), tx);

        let request = JsonRpcRequest::call(id, method, params);
        if let Err(e) = self.transport.send(serde_json::to_value(&request)?).await {
            self.pending.lock().await.remove(&key);
            return Err(e);
        }

        let outcome = tokio::time::timeout(timeout, rx).await;
        match outcome {
            Ok(Ok(response)) => {
                if let Some(err) = response.error {
                    return Err(Error::protocol(err.code, err.message));
                }
                Ok(response.result.unwrap_or(Value::Null))
            }
            Ok(Err(_)) => Err(Error::ConnectionClosed),
            Err(_) => {
                self.pending.lock().await.remove(&key);
                Err(Error::Timeout)
            }
        }
    }

    async fn notify(&self, method: &str, params: Option<Value>) {
        let notification = JsonRpcRequest::notification(method, params);
        if let Ok(value) = serde_json::to_value(&notification) {
            if let Err(e) = self.transport.send(value).await {
                tracing::warn!("failed to send notification {method}: {e}");
            }
        }
    }

    /// Perform the `initialize` handshake, or return the cached result if
    /// this client already completed one (spec §4.4: "If the streamable
    /// transport has already exchanged initialize ... the second
    /// initialize is skipped").
    pub async fn initialize(
        &self,
        client_name: &str,
        client_version: &str,
    ) -> Result<InitializeResult> {
        if let Some(cached) = self.init_result.read().await.clone() {
            return Ok(cached);
        }

        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "roots": {"listChanged": true},
                "sampling": {}
            },
            "clientInfo": {
                "name": client_name,
                "version": client_version,
            }
        });

        let result = self.request("initialize", Some(params), LIST_TIMEOUT).await?;
        let protocol_version = result
            .get("protocolVersion")
            .and_then(Value::as_str)
            .unwrap_or(PROTOCOL_VERSION)
            .to_string();
        let capabilities = result.get("capabilities").cloned().unwrap_or(Value::Null);
        let server_info = result.get("serverInfo").cloned().unwrap_or(Value::Null);

        let init = InitializeResult {
            protocol_version,
            capabilities,
            server_info,
        };
        *self.init_result.write().await = Some(init.clone());

        self.notify("notifications/initialized", None).await;
        Ok(init)
    }

    /// Cached server info/capabilities, once `initialize` has completed.
    pub async fn server_info(&self) -> Option<Value> {
        self.init_result.read().await.as_ref().map(|r| r.server_info.clone())
    }

    pub async fn capabilities(&self) -> Option<Value> {
        self.init_result.read().await.as_ref().map(|r| r.capabilities.clone())
    }

    /// Generic "list" call: treats `-32601` as a benign empty result and
    /// extracts `field` as an array, dropping null entries.
    async fn list(&self, method: &str, field: &str) -> Result<Vec<Value>> {
        match self.request(method, None, LIST_TIMEOUT).await {
            Ok(result) => {
                let items = result
                    .get(field)
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                Ok(items.into_iter().filter(|v| !v.is_null()).collect())
            }
            Err(Error::Protocol(detail)) if detail.code == Error::METHOD_NOT_FOUND => {
                tracing::warn!(method, "method not found, degrading to empty list");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn list_tools(&self) -> Result<Vec<Value>> {
        self.list("tools/list", "tools").await
    }

    pub async fn list_resources(&self) -> Result<Vec<Value>> {
        self.list("resources/list", "resources").await
    }

    pub async fn list_resource_templates(&self) -> Result<Vec<Value>> {
        self.list("resources/templates/list", "resourceTemplates").await
    }

    pub async fn list_prompts(&self) -> Result<Vec<Value>> {
        self.list("prompts/list", "prompts").await
    }

    /// Invoke a tool with already-coerced arguments (see
    /// `inspector_protocol::coercion` for schema-driven coercion from raw
    /// string inputs).
    pub async fn call_tool(&self, name: &str, args: Value) -> Result<Value> {
        let params = json!({"name": name, "arguments": args});
        let result = self
            .request("tools/call", Some(params.clone()), INVOKE_TIMEOUT)
            .await?;
        self.notify_observer(ArtifactKind::Tool, name, &args, &result, None).await;
        Ok(result)
    }

    pub async fn read_resource(&self, uri: &str) -> Result<Value> {
        let params = json!({"uri": uri});
        let result = self
            .request("resources/read", Some(params), INVOKE_TIMEOUT)
            .await?;
        self.notify_observer(ArtifactKind::Resource, uri, &Value::Null, &result, Some(uri))
            .await;
        Ok(result)
    }

    pub async fn get_prompt(&self, name: &str, args: Option<Value>) -> Result<Value> {
        let mut params = json!({"name": name});
        if let Some(args) = args.clone() {
            params["arguments"] = args;
        }
        let result = self
            .request("prompts/get", Some(params), INVOKE_TIMEOUT)
            .await?;
        self.notify_observer(
            ArtifactKind::Prompt,
            name,
            args.as_ref().unwrap_or(&Value::Null),
            &result,
            None,
        )
        .await;
        Ok(result)
    }

    async fn notify_observer(
        &self,
        kind: ArtifactKind,
        target_name: &str,
        params: &Value,
        result: &Value,
        uri: Option<&str>,
    ) {
        let Some(observer) = self.observer.read().await.clone() else {
            return;
        };
        let target_name = target_name.to_string();
        let params = params.clone();
        let result = result.clone();
        let uri = uri.map(str::to_string);
        tokio::spawn(async move {
            observer
                .observe(kind, &target_name, &params, &result, uri.as_deref())
                .await;
        });
    }

    pub async fn disconnect(&self) -> Result<()> {
        if let Some(handle) = self.reader_task.lock().await.take() {
            handle.abort();
        }
        self.transport.close().await?;
        Self::fail_all_pending(&self.pending).await;
        *self.init_result.write().await = None;
        Ok(())
    }
}

impl<T: Transport> std::fmt::Debug for ProtocolClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolClient").finish_non_exhaustive()
    }
}
