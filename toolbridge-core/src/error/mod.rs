//! Error handling for the bridge core.
//!
//! ## Module Organization
//!
//! - `jsonrpc` - JSON-RPC 2.0 error object shared by remote and local failures
//! - `BridgeError` - every failure the bridge can synthesize on its own
//!
//! Nothing in this module terminates the process. Every [`BridgeError`] is
//! converted into a JSON-RPC error object and delivered to the local caller
//! as data.

pub mod jsonrpc;

use jsonrpc::JsonRpcError;
use thiserror::Error;

/// Bridge-internal code: network or connection failure.
pub const CODE_CONNECTION_FAILED: i64 = -32000;
/// Bridge-internal code: the outbound exchange exceeded its timeout.
pub const CODE_TIMEOUT: i64 = -32001;
/// Bridge-internal code: remote answered with a non-success HTTP status.
pub const CODE_HTTP_STATUS: i64 = -32002;
/// Bridge-internal code: response body exceeded the size cap.
pub const CODE_RESPONSE_TOO_LARGE: i64 = -32003;
/// Bridge-internal code: response document could not be parsed.
pub const CODE_MALFORMED_RESPONSE: i64 = -32004;
/// Bridge-internal code: event-stream response carried no body.
pub const CODE_NO_RESPONSE_BODY: i64 = -32005;
/// Bridge-internal code: event stream closed without a terminal message.
pub const CODE_NO_TERMINAL_RESULT: i64 = -32006;

/// All failures the bridge can produce locally, plus the pass-through
/// variant for failures reported by the remote endpoint.
///
/// Protocol variants (`ParseError` .. `InternalError`) are raised by the
/// local stdio server; the `Upstream*` and stream variants are raised by the
/// forwarder and reassembler; `Remote` wraps a failure envelope returned by
/// the remote endpoint.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BridgeError {
    // Local protocol errors
    /// Invalid JSON received from the local caller.
    #[error("Invalid JSON: {details}")]
    ParseError {
        /// Description of the parse error
        details: String,
    },

    /// Message is not a valid JSON-RPC 2.0 request.
    #[error("Invalid JSON-RPC request: {details}")]
    InvalidRequest {
        /// Description of what makes the request invalid
        details: String,
    },

    /// The requested method is not served by the bridge.
    #[error("Method '{method}' not found")]
    MethodNotFound {
        /// The method name that was not found
        method: String,
    },

    /// The method parameters are invalid.
    #[error("Invalid parameters: {details}")]
    InvalidParams {
        /// Description of the parameter validation failure
        details: String,
    },

    /// Internal failure that should not happen.
    #[error("Internal error: {details}")]
    InternalError {
        /// Short description for diagnostics
        details: String,
    },

    // Transport errors
    /// Could not reach the remote endpoint.
    #[error("Cannot connect to remote MCP server: {reason}")]
    UpstreamConnectionFailed {
        /// The remote URL that failed
        url: String,
        /// Reason for the connection failure
        reason: String,
    },

    /// The outbound exchange did not finish within the timeout.
    #[error("Remote MCP server did not respond within {timeout_secs}s")]
    UpstreamTimeout {
        /// The remote URL that timed out
        url: String,
        /// The timeout duration in seconds
        timeout_secs: u64,
    },

    /// Remote answered with a non-success HTTP status.
    ///
    /// `body_prefix` never holds more than the configured error-body bound.
    #[error("HTTP {status}: {body_prefix}")]
    UpstreamHttpStatus {
        /// HTTP status code
        status: u16,
        /// Bounded prefix of the error body
        body_prefix: String,
    },

    /// Response body exceeded the size cap.
    #[error("Response too large: exceeds {max_bytes} byte limit")]
    ResponseTooLarge {
        /// The configured size cap
        max_bytes: usize,
    },

    /// Response document was not a valid JSON-RPC envelope.
    #[error("Malformed response from remote MCP server: {details}")]
    MalformedResponse {
        /// Parser error description
        details: String,
    },

    // Stream protocol errors
    /// Event-stream response had no readable body.
    #[error("no response body")]
    NoResponseBody,

    /// Event stream ended without a message for the expected request.
    #[error("no terminal result for request {correlation_id}")]
    NoTerminalResult {
        /// The correlation ID that never received a terminal message
        correlation_id: i64,
    },

    // Remote-reported
    /// The remote endpoint returned a failure envelope.
    #[error("{}", .0.message)]
    Remote(JsonRpcError),
}

impl BridgeError {
    /// Maps error to a JSON-RPC 2.0 error code.
    ///
    /// Standard codes (-32700 to -32603) cover local protocol errors; the
    /// -32000 to -32006 range is reserved for bridge-internal transport and
    /// stream failures. Remote failures keep the remote-assigned code.
    pub fn to_jsonrpc_code(&self) -> i64 {
        match self {
            Self::ParseError { .. } => jsonrpc::PARSE_ERROR,
            Self::InvalidRequest { .. } => jsonrpc::INVALID_REQUEST,
            Self::MethodNotFound { .. } => jsonrpc::METHOD_NOT_FOUND,
            Self::InvalidParams { .. } => jsonrpc::INVALID_PARAMS,
            Self::InternalError { .. } => jsonrpc::INTERNAL_ERROR,

            Self::UpstreamConnectionFailed { .. } => CODE_CONNECTION_FAILED,
            Self::UpstreamTimeout { .. } => CODE_TIMEOUT,
            Self::UpstreamHttpStatus { .. } => CODE_HTTP_STATUS,
            Self::ResponseTooLarge { .. } => CODE_RESPONSE_TOO_LARGE,
            Self::MalformedResponse { .. } => CODE_MALFORMED_RESPONSE,
            Self::NoResponseBody => CODE_NO_RESPONSE_BODY,
            Self::NoTerminalResult { .. } => CODE_NO_TERMINAL_RESULT,

            Self::Remote(err) => err.code,
        }
    }

    /// Returns the error type name for logging.
    pub fn error_type_name(&self) -> &'static str {
        match self {
            Self::ParseError { .. } => "parse_error",
            Self::InvalidRequest { .. } => "invalid_request",
            Self::MethodNotFound { .. } => "method_not_found",
            Self::InvalidParams { .. } => "invalid_params",
            Self::InternalError { .. } => "internal_error",
            Self::UpstreamConnectionFailed { .. } => "upstream_connection_failed",
            Self::UpstreamTimeout { .. } => "upstream_timeout",
            Self::UpstreamHttpStatus { .. } => "upstream_http_status",
            Self::ResponseTooLarge { .. } => "response_too_large",
            Self::MalformedResponse { .. } => "malformed_response",
            Self::NoResponseBody => "no_response_body",
            Self::NoTerminalResult { .. } => "no_terminal_result",
            Self::Remote(_) => "remote_error",
        }
    }

    /// Converts the error to a JSON-RPC error object.
    ///
    /// Remote failures are returned verbatim, including their `data`.
    pub fn to_jsonrpc_error(&self) -> JsonRpcError {
        match self {
            Self::Remote(err) => err.clone(),
            other => JsonRpcError::new(other.to_jsonrpc_code(), other.to_string()),
        }
    }
}

impl From<JsonRpcError> for BridgeError {
    fn from(err: JsonRpcError) -> Self {
        Self::Remote(err)
    }
}
