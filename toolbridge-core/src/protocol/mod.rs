//! MCP protocol types handled by the bridge.
//!
//! The bridge relays two operations (`tools/list`, `tools/call`) and one
//! notification (`notifications/progress`). Everything else in a remote
//! payload is carried through untouched: unknown fields land in `extra`
//! maps and content blocks stay opaque JSON.

mod methods;
mod progress;
mod tools;

pub use methods::*;
pub use progress::*;
pub use tools::*;
