//! Centralized default values for bridge configuration.
//!
//! All timing and size limits used by the forwarder and reassembler are
//! defined here so the CLI, the core, and the tests agree on them.

use std::time::Duration;

/// Production MCP endpoint used when `--server-url` is not given.
pub const DEFAULT_SERVER_URL: &str = "https://api.toolbridge.dev/mcp";

/// Expected prefix of issued API keys. A key without it only triggers a warning.
pub const API_KEY_PREFIX: &str = "tb_";

/// Wall-clock limit for one outbound exchange, stream draining included.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// TCP + TLS handshake limit.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum size of a single JSON response document (10 MiB).
pub const MAX_RESPONSE_BYTES: usize = 10 * 1024 * 1024;

/// Maximum number of error-body bytes echoed into a failure message.
pub const MAX_ERROR_BODY_BYTES: usize = 200;

/// MCP protocol revision advertised to the remote endpoint and local caller.
pub const PROTOCOL_VERSION: &str = "2025-06-18";

/// Centralized default values, grouped for struct-update syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeDefaults {
    /// Whole-exchange timeout.
    pub request_timeout: Duration,
    /// Connection establishment timeout.
    pub connect_timeout: Duration,
    /// JSON document size cap.
    pub max_response_bytes: usize,
    /// Error-body echo cap.
    pub max_error_body_bytes: usize,
}

impl Default for BridgeDefaults {
    fn default() -> Self {
        Self {
            request_timeout: REQUEST_TIMEOUT,
            connect_timeout: CONNECT_TIMEOUT,
            max_response_bytes: MAX_RESPONSE_BYTES,
            max_error_body_bytes: MAX_ERROR_BODY_BYTES,
        }
    }
}
