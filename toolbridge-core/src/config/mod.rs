//! Bridge configuration.
//!
//! A [`BridgeConfig`] is the resolved `{api key, server URL}` pair plus the
//! fixed limits from [`defaults`]. Building one runs the destination policy,
//! so any `BridgeConfig` in hand points at an allowed endpoint.

pub mod defaults;
pub mod destination;
pub mod error;

use std::time::Duration;

pub use defaults::{
    API_KEY_PREFIX, BridgeDefaults, DEFAULT_SERVER_URL, MAX_ERROR_BODY_BYTES, MAX_RESPONSE_BYTES,
    PROTOCOL_VERSION, REQUEST_TIMEOUT,
};
pub use destination::{DestinationError, ValidatedUrl, validate_destination};
pub use error::ConfigError;

/// Resolved configuration handed to the forwarder.
#[derive(Clone)]
pub struct BridgeConfig {
    /// Opaque credential sent with every outbound call
    pub api_key: String,
    /// Remote MCP endpoint (already validated)
    pub server_url: ValidatedUrl,
    /// Whole-exchange timeout
    pub timeout: Duration,
    /// Connection establishment timeout
    pub connect_timeout: Duration,
    /// JSON document size cap in bytes
    pub max_response_bytes: usize,
    /// Number of error-body bytes echoed into failure messages
    pub max_error_body_bytes: usize,
}

/// Custom Debug implementation that redacts the API key.
impl std::fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("api_key", &"<redacted>")
            .field("server_url", &self.server_url.as_str())
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("max_response_bytes", &self.max_response_bytes)
            .field("max_error_body_bytes", &self.max_error_body_bytes)
            .finish()
    }
}

impl BridgeConfig {
    /// Build a configuration from a raw API key and server URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingApiKey`] for an empty key and
    /// [`ConfigError::Destination`] if the URL fails the destination policy.
    pub fn new(api_key: impl Into<String>, server_url: &str) -> Result<Self, ConfigError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        let server_url = validate_destination(server_url)?;
        Ok(Self::with_validated_url(api_key, server_url))
    }

    /// Build a configuration around an already-validated URL.
    pub fn with_validated_url(api_key: impl Into<String>, server_url: ValidatedUrl) -> Self {
        let defaults = BridgeDefaults::default();
        Self {
            api_key: api_key.into(),
            server_url,
            timeout: defaults.request_timeout,
            connect_timeout: defaults.connect_timeout,
            max_response_bytes: defaults.max_response_bytes,
            max_error_body_bytes: defaults.max_error_body_bytes,
        }
    }

    /// Whether the key follows the issued-key naming convention.
    ///
    /// A mismatch is only worth a warning: self-hosted endpoints issue
    /// keys in their own format.
    pub fn api_key_has_expected_prefix(&self) -> bool {
        self.api_key.starts_with(API_KEY_PREFIX)
    }
}
