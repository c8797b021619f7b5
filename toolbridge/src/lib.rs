//! toolbridge: a local stdio MCP server backed by a remote HTTP MCP endpoint.

pub mod cli;
pub mod error;
pub mod stdio;
