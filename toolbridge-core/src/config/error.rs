//! Configuration error types.
//!
//! Configuration errors are the only errors that terminate the process;
//! everything else is recovered into a JSON-RPC failure.

use thiserror::Error;

use super::destination::DestinationError;

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No API key was supplied by flag or environment.
    #[error("--api-key is required")]
    MissingApiKey,

    /// The server URL failed the destination policy.
    #[error(transparent)]
    Destination(#[from] DestinationError),

    /// The API key cannot be carried in an HTTP header.
    #[error("API key contains characters not allowed in an HTTP header")]
    InvalidApiKey,

    /// The HTTP client could not be built from the configuration.
    #[error("failed to build HTTP client: {reason}")]
    HttpClient {
        /// Builder error message
        reason: String,
    },
}
