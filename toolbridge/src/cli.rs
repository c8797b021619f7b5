//! CLI arguments for `toolbridge`.
//!
//! Defined separately from `main.rs` so integration tests can parse them
//! directly.

use clap::Parser;
use toolbridge_core::config::{BridgeConfig, ConfigError, DEFAULT_SERVER_URL};

/// Environment variable consulted when `--api-key` is absent.
pub const API_KEY_ENV: &str = "TOOLBRIDGE_API_KEY";

/// Environment variable consulted when `--server-url` is absent.
pub const SERVER_URL_ENV: &str = "TOOLBRIDGE_SERVER_URL";

/// toolbridge: expose a remote HTTP MCP server as a local stdio MCP server.
#[derive(Parser, Debug)]
#[command(name = "toolbridge", version)]
pub struct Cli {
    /// API key for the remote server.
    #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Remote MCP endpoint.
    #[arg(long, env = SERVER_URL_ENV, default_value = DEFAULT_SERVER_URL)]
    pub server_url: String,

    /// Enable debug logging.
    #[arg(long, short)]
    pub verbose: bool,
}

impl Cli {
    /// Resolve the arguments into a validated bridge configuration.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingApiKey`] if no key was given by flag or
    /// environment, [`ConfigError::Destination`] if the server URL is
    /// rejected by the destination policy.
    pub fn into_config(self) -> Result<BridgeConfig, ConfigError> {
        let api_key = self.api_key.ok_or(ConfigError::MissingApiKey)?;
        BridgeConfig::new(api_key, &self.server_url)
    }
}
