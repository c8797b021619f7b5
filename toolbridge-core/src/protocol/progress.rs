//! `notifications/progress` payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::methods::NOTIFICATION_PROGRESS;

/// Progress token: a string or integer chosen by the caller, or generated
/// by the bridge when the caller supplied none.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProgressToken {
    /// Integer token
    Number(i64),
    /// String token
    String(String),
}

impl ProgressToken {
    /// A fresh, process-unique token.
    pub fn generate() -> Self {
        Self::String(uuid::Uuid::new_v4().to_string())
    }

    /// Read a token from a JSON value, if it has a valid token type.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::String(s.clone())),
            Value::Number(n) => n.as_i64().map(Self::Number),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProgressToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

/// Interim progress reported by the remote for one outstanding call.
///
/// Correlated by `progress_token`, not by request ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    /// Token of the owning call
    pub progress_token: ProgressToken,

    /// Units completed so far
    pub progress: f64,

    /// Total units, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,

    /// Human-readable status line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ProgressEvent {
    /// The full JSON-RPC notification for this event.
    pub fn to_notification(&self) -> Value {
        serde_json::json!({
            "jsonrpc": "2.0",
            "method": NOTIFICATION_PROGRESS,
            "params": self,
        })
    }
}
