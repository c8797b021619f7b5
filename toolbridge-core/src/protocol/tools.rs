//! `tools/list` and `tools/call` payloads.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Reads an absent or `null` list as empty.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// MCP tool definition as returned by `tools/list`.
///
/// Sourced entirely from the remote endpoint and never cached beyond the
/// call that fetched it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// The tool name (unique identifier)
    pub name: String,

    /// Human-readable description of the tool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// JSON Schema for the tool's input parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,

    /// Additional properties from the remote (preserved as-is)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Result of `tools/list`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListToolsResult {
    /// Tool definitions; empty when the remote omits the field or sends `null`.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tools: Vec<ToolDefinition>,

    /// Pagination cursor, relayed unchanged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// One block of tool output.
///
/// Opaque to the bridge: remote blocks are relayed verbatim, whatever their
/// `type`. Only locally synthesized error text is built here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentBlock(pub Value);

impl ContentBlock {
    /// A `{"type": "text", "text": ...}` block.
    pub fn text(text: impl Into<String>) -> Self {
        Self(serde_json::json!({
            "type": "text",
            "text": text.into(),
        }))
    }

    /// The block's `type` tag, if any.
    pub fn kind(&self) -> Option<&str> {
        self.0.get("type").and_then(Value::as_str)
    }

    /// The block's `text` payload, for text blocks.
    pub fn as_text(&self) -> Option<&str> {
        self.0.get("text").and_then(Value::as_str)
    }
}

/// Result of `tools/call`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    /// Output blocks.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: Vec<ContentBlock>,

    /// Set when the tool itself reported failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,

    /// Additional properties from the remote (e.g. `structuredContent`)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CallToolResult {
    /// A failed call rendered as a single `Error: <message>` text block.
    ///
    /// Invocation failures are returned to the agent as data so it can
    /// reason about them and retry.
    pub fn error_text(message: &str) -> Self {
        Self {
            content: vec![ContentBlock::text(format!("Error: {message}"))],
            is_error: Some(true),
            extra: Map::new(),
        }
    }
}

/// Parameters of an incoming `tools/call` from the local caller.
#[derive(Debug, Clone, Deserialize)]
pub struct CallToolParams {
    /// Tool to invoke
    pub name: String,

    /// Tool arguments (defaults to `{}`)
    #[serde(default)]
    pub arguments: Option<Value>,

    /// Request metadata; carries the optional `progressToken`
    #[serde(default, rename = "_meta")]
    pub meta: Option<Map<String, Value>>,
}
