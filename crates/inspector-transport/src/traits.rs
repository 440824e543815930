//! The transport capability abstraction both SSE and streamable-HTTP
//! implement, so [`inspector_protocol::ProtocolClient`] is polymorphic over
//! the wire details.
//!
//! Grounded on `turbomcp_transport_traits::Transport`
//! (`turbomcp-transport-traits/src/traits.rs`), which defines one trait
//! object-safe over `Pin<Box<dyn Future>>`. This crate uses `async-trait`
//! instead (already a workspace dependency used the same way by
//! `turbomcp-transport-traits`' own `BidirectionalTransport`), which expands
//! to the same shape with less boilerplate at call sites.

use async_trait::async_trait;
use inspector_core::Result;
use serde_json::Value;

/// One inbound event surfaced by [`Transport::receive`]: either a decoded
/// JSON-RPC frame, or a clean stream closure. A transport-level failure is
/// reported as `Err` from `receive` itself, mirroring
/// `turbomcp_transport_traits::Transport::receive`'s
/// `TransportResult<Option<TransportMessage>>` shape (`Ok(None)` there plays
/// the role `Closed` plays here).
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// One JSON-RPC request, response, or notification frame.
    Message(Value),
    /// The transport's read side ended; no further events will arrive.
    Closed,
}

/// Shared capability set for the SSE and streamable-HTTP transports.
///
/// A single background task is expected to be the sole caller of
/// `receive()` for a given transport instance (single-reader discipline,
/// spec §5's "Shared-resource policy"); [`inspector_protocol::ProtocolClient`]
/// owns that task and correlates replies by JSON-RPC `id`.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Perform whatever handshake the transport needs (SSE endpoint
    /// announcement, or the streamable transport's implicit `initialize`)
    /// and leave the transport ready to `send`.
    async fn start(&self) -> Result<()>;

    /// Send one JSON-RPC request or notification. Must not be called before
    /// `start()` completes.
    async fn send(&self, message: Value) -> Result<()>;

    /// Await the next inbound event. Implementations poll their underlying
    /// stream/queue; callers are expected to loop on this until `Closed`.
    async fn receive(&self) -> Result<TransportEvent>;

    /// Tear down the connection and release resources.
    async fn close(&self) -> Result<()>;

    /// The session identifier negotiated with the server, if any.
    fn session_id(&self) -> Option<String>;

    /// Record the protocol version negotiated during `initialize`, so a
    /// transport that needs it on later requests (neither transport in
    /// this spec does, today) has somewhere to put it.
    fn set_protocol_version(&self, version: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_event_equality() {
        assert_eq!(TransportEvent::Closed, TransportEvent::Closed);
        assert_ne!(
            TransportEvent::Message(Value::Null),
            TransportEvent::Closed
        );
    }
}
