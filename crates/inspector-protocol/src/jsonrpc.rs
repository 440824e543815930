//! JSON-RPC 2.0 message shapes (spec §6 "MCP wire protocol").

use inspector_core::MessageId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A JSON-RPC 2.0 request or notification (notifications omit `id`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<MessageId>,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn call(id: MessageId, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id: Some(id),
            method: method.into(),
            params,
        }
    }

    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id: None,
            method: method.into(),
            params,
        }
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// A JSON-RPC error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A JSON-RPC 2.0 response: exactly one of `result`/`error` is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<MessageId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// `-32601`, the reserved "method not found" code the enumeration
    /// boundary treats as "capability absent" rather than a hard error.
    pub fn is_method_not_found(&self) -> bool {
        self.error
            .as_ref()
            .is_some_and(|e| e.code == inspector_core::Error::METHOD_NOT_FOUND)
    }
}

/// Distinguish inbound frames by shape: a response carries `result` or
/// `error`; a request carries `method` + `id`; a notification carries
/// `method` with no `id`.
pub fn classify(value: &Value) -> FrameKind {
    let has_method = value.get("method").is_some();
    let has_id = value.get("id").is_some();
    let has_result_or_error = value.get("result").is_some() || value.get("error").is_some();

    if has_result_or_error && !has_method {
        FrameKind::Response
    } else if has_method && has_id {
        FrameKind::Request
    } else if has_method {
        FrameKind::Notification
    } else {
        FrameKind::Response
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Response,
    Request,
    Notification,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_response_by_result() {
        let v = json!({"jsonrpc":"2.0","id":1,"result":{}});
        assert_eq!(classify(&v), FrameKind::Response);
    }

    #[test]
    fn classifies_request_by_method_and_id() {
        let v = json!({"jsonrpc":"2.0","id":1,"method":"tools/list"});
        assert_eq!(classify(&v), FrameKind::Request);
    }

    #[test]
    fn classifies_notification_by_method_without_id() {
        let v = json!({"jsonrpc":"2.0","method":"notifications/initialized"});
        assert_eq!(classify(&v), FrameKind::Notification);
    }

    #[test]
    fn method_not_found_is_recognized() {
        let resp = JsonRpcResponse {
            jsonrpc: "2.0".into(),
            id: Some(MessageId::Number(1)),
            result: None,
            error: Some(JsonRpcError {
                code: -32601,
                message: "method not found".into(),
                data: None,
            }),
        };
        assert!(resp.is_method_not_found());
    }
}
