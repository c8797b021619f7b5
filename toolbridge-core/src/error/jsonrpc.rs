//! JSON-RPC 2.0 error object.
//!
//! The same structure carries both failures reported by the remote endpoint
//! (passed through untouched) and failures synthesized locally by the bridge.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Standard JSON-RPC parse error code.
pub const PARSE_ERROR: i64 = -32700;
/// Standard JSON-RPC invalid request code.
pub const INVALID_REQUEST: i64 = -32600;
/// Standard JSON-RPC method-not-found code.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Standard JSON-RPC invalid params code.
pub const INVALID_PARAMS: i64 = -32602;
/// Standard JSON-RPC internal error code.
pub const INTERNAL_ERROR: i64 = -32603;

/// JSON-RPC 2.0 error object.
///
/// `data` is kept as an opaque [`Value`] so that remote-supplied error
/// details survive the round trip without the bridge having to understand
/// them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code (standard, bridge-internal, or remote-assigned)
    pub code: i64,

    /// Human-readable error message
    pub message: String,

    /// Additional error data (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// Create an error object without `data`.
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}
