//! Error types for the stdio transport.
//!
//! `FramingError` covers NDJSON line parsing failures: size limits, malformed
//! JSON, JSON-RPC version validation, batch rejection, and IO.
//!
//! `StdioError` covers the failures that end the process: bad configuration
//! and an unusable stdin.

use toolbridge_core::ConfigError;
use toolbridge_core::error::jsonrpc::{INVALID_REQUEST, JsonRpcError, PARSE_ERROR};

/// Errors that can occur when parsing an NDJSON-framed JSON-RPC message.
///
/// Each variant maps to the JSON-RPC error the server answers with; none of
/// them stops the read loop except `Io`.
#[derive(Debug, thiserror::Error)]
pub enum FramingError {
    /// A single NDJSON line exceeds the configured maximum size.
    ///
    /// Checked before JSON parsing to prevent allocation of oversized values.
    #[error("Message exceeds maximum size of {max_bytes} bytes")]
    MessageTooLarge {
        /// The configured maximum message size in bytes.
        max_bytes: usize,
    },

    /// The line is not valid JSON, or its structure is invalid for JSON-RPC.
    #[error("Malformed JSON: {reason}")]
    MalformedJson {
        /// Human-readable description of the parse failure.
        reason: String,
    },

    /// The `jsonrpc` field is absent from the JSON object.
    #[error("Missing required jsonrpc field")]
    MissingVersion,

    /// The `jsonrpc` field is present but not `"2.0"`.
    #[error("Unsupported JSON-RPC version: {version}")]
    UnsupportedVersion {
        /// The version string found in the message.
        version: String,
    },

    /// The message is a JSON array, indicating a JSON-RPC batch request.
    ///
    /// MCP does not support batch requests.
    #[error("JSON-RPC batch requests (arrays) are not supported")]
    UnsupportedBatch,

    /// An underlying IO error occurred while reading from stdin.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FramingError {
    /// The JSON-RPC error reported back to the caller for this failure.
    pub fn to_jsonrpc_error(&self) -> JsonRpcError {
        let code = match self {
            Self::MalformedJson { .. } => PARSE_ERROR,
            _ => INVALID_REQUEST,
        };
        JsonRpcError::new(code, self.to_string())
    }

    /// Short label for logs.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::MessageTooLarge { .. } => "message_too_large",
            Self::MalformedJson { .. } => "malformed_json",
            Self::MissingVersion => "missing_version",
            Self::UnsupportedVersion { .. } => "unsupported_version",
            Self::UnsupportedBatch => "unsupported_batch",
            Self::Io(_) => "io",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Process-Level Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that terminate `toolbridge` with a non-zero exit code.
#[derive(Debug, thiserror::Error)]
pub enum StdioError {
    /// The configuration was rejected at startup.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Reading stdin failed.
    #[error("IO error: {0}")]
    StdioIo(#[from] std::io::Error),
}
