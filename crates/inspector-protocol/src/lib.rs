//! JSON-RPC 2.0 MCP client: request/response correlation, the
//! `initialize` handshake, enumeration and invocation methods, and the
//! artifact catalog (spec §4.4–4.5).

mod catalog;
mod client;
pub mod coercion;
mod jsonrpc;

pub use catalog::ArtifactCatalog;
pub use client::{InitializeResult, InvocationObserver, ProtocolClient, INVOKE_TIMEOUT, LIST_TIMEOUT};
pub use jsonrpc::{classify, FrameKind, JsonRpcError, JsonRpcRequest, JsonRpcResponse};
