//! SSE and streamable-HTTP transports for the MCP security inspector.
//!
//! Both transports implement the shared [`Transport`] trait so
//! `inspector-protocol`'s `ProtocolClient` is polymorphic over wire
//! details — see `turbomcp_transport_traits::Transport` for the pattern
//! this generalizes.

mod sse;
mod streamable;
mod traits;

pub use sse::SseTransport;
pub use streamable::{SessionIdPlacement, StreamableTransport};
pub use traits::{Transport, TransportEvent};
