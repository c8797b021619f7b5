//! Outbound transport to the remote MCP endpoint.
//!
//! This module handles the JSON-RPC 2.0 envelopes, outstanding-call
//! bookkeeping, the HTTP exchange itself, and reassembly of event-stream
//! responses. The stdio side lives in the `toolbridge` binary crate.

pub mod jsonrpc;
pub mod pending;
pub mod sse;
pub mod upstream;

// Re-export core types
pub use jsonrpc::{
    ClassifyError, InboundEnvelope, JsonRpcId, JsonRpcResponse, MessageKind, Origin,
    OutboundEnvelope, classify,
};
pub use pending::{PendingCall, PendingCalls, PendingGuard};
pub use sse::{StreamReassembler, reassemble};
pub use upstream::{UpstreamBody, UpstreamClient, UpstreamForwarder};
