//! Stdio side of the bridge: NDJSON framing and the local MCP server.

pub mod ndjson;
pub mod server;

pub use server::{StdioWriter, run_stdio_server, serve};
