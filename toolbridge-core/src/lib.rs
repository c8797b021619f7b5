//! toolbridge core: the engine behind the stdio-to-HTTP MCP bridge.
//!
//! This library validates the remote destination, forwards JSON-RPC
//! envelopes over HTTP, reassembles event-stream responses, and relays
//! progress notifications. The `toolbridge` binary wraps it in a stdio
//! MCP server.
//!
//! The entry point is [`Bridge`]: build one from a [`BridgeConfig`] and a
//! [`NotificationSink`] for the local side, then call
//! [`Bridge::list_tools`] and [`Bridge::call_tool`].

pub mod bridge;
pub mod config;
pub mod error;
pub mod protocol;
pub mod relay;
pub mod transport;

pub use bridge::Bridge;
pub use config::{BridgeConfig, ConfigError, DestinationError, ValidatedUrl, validate_destination};
pub use error::BridgeError;
pub use relay::{NotificationSink, ProgressRelay, SinkError};
