//! JSON-RPC 2.0 envelope types.
//!
//! # JSON-RPC 2.0 Compliance
//!
//! - Requests have `id`, `method`, and optional `params`
//! - `id` type (string or integer) MUST be preserved in responses
//! - A response carries exactly one of `result` / `error`
//!
//! [`OutboundEnvelope`] is what the forwarder sends; its `id` is the
//! bridge-assigned correlation ID. [`JsonRpcResponse`] is used for both the
//! remote's replies (aliased as [`InboundEnvelope`]) and the stdio server's
//! replies to the local caller.
//!
//! [`classify`] sorts a parsed message into request, response or
//! notification. The local caller is held to strict JSON-RPC 2.0; remote
//! messages are read the way [`JsonRpcResponse`] deserializes them, with the
//! `jsonrpc` member optional, so a remote behaves the same whether it answers
//! with a single document or an event stream.

use std::borrow::Cow;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use thiserror::Error;

use crate::error::jsonrpc::JsonRpcError;

/// JSON-RPC 2.0 version constant.
pub const JSONRPC_VERSION: &str = "2.0";

fn default_version() -> Cow<'static, str> {
    Cow::Borrowed(JSONRPC_VERSION)
}

/// JSON-RPC 2.0 request ID.
///
/// Never coerce between types! If the caller sends `"id": 1`, respond with
/// `"id": 1`, not `"id": "1"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JsonRpcId {
    /// Integer ID (e.g., `"id": 1`)
    Number(i64),
    /// String ID (e.g., `"id": "abc-123"`)
    String(String),
    /// Explicit null ID
    Null,
}

impl Serialize for JsonRpcId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            JsonRpcId::Number(n) => serializer.serialize_i64(*n),
            JsonRpcId::String(s) => serializer.serialize_str(s),
            JsonRpcId::Null => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for JsonRpcId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::Number(n) => n.as_i64().map(JsonRpcId::Number).ok_or_else(|| {
                serde::de::Error::custom("JSON-RPC ID must be integer, not float")
            }),
            Value::String(s) => Ok(JsonRpcId::String(s)),
            Value::Null => Ok(JsonRpcId::Null),
            _ => Err(serde::de::Error::custom(
                "JSON-RPC ID must be string, integer, or null",
            )),
        }
    }
}

impl std::fmt::Display for JsonRpcId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JsonRpcId::Number(n) => write!(f, "{n}"),
            JsonRpcId::String(s) => f.write_str(s),
            JsonRpcId::Null => f.write_str("null"),
        }
    }
}

/// A request sent to the remote endpoint.
///
/// Created at call time, serialized once, and dropped when the exchange ends.
#[derive(Clone, Serialize)]
pub struct OutboundEnvelope {
    /// Always "2.0"
    pub jsonrpc: Cow<'static, str>,
    /// Bridge-assigned correlation ID
    #[serde(rename = "id")]
    pub correlation_id: i64,
    /// Remote operation (`tools/list`, `tools/call`)
    pub method: String,
    /// Operation parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// Custom Debug implementation that redacts params (tool arguments may
/// carry user data).
impl std::fmt::Debug for OutboundEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboundEnvelope")
            .field("correlation_id", &self.correlation_id)
            .field("method", &self.method)
            .field("params", &self.params.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl OutboundEnvelope {
    /// Create a new outbound request.
    pub fn new(correlation_id: i64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: default_version(),
            correlation_id,
            method: method.into(),
            params,
        }
    }

    /// The correlation ID in its wire form.
    pub fn id(&self) -> JsonRpcId {
        JsonRpcId::Number(self.correlation_id)
    }
}

/// JSON-RPC 2.0 response.
///
/// The `id` field always serializes: `None` becomes `"id": null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Always "2.0"
    #[serde(default = "default_version")]
    pub jsonrpc: Cow<'static, str>,
    /// Request ID - always serialized (None becomes null)
    #[serde(default)]
    pub id: Option<JsonRpcId>,
    /// Result (mutually exclusive with error)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error (mutually exclusive with result)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// A reply received from the remote endpoint, or synthesized locally when
/// the exchange failed.
pub type InboundEnvelope = JsonRpcResponse;

impl JsonRpcResponse {
    /// Create a success response.
    pub fn success(id: Option<JsonRpcId>, result: Value) -> Self {
        Self {
            jsonrpc: default_version(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    ///
    /// Pass `None` for `id` when the request ID could not be determined
    /// (e.g., parse error); it serializes as `"id": null`.
    pub fn error(id: Option<JsonRpcId>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: default_version(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Whether this response answers the request with `correlation_id`.
    pub fn answers(&self, correlation_id: i64) -> bool {
        matches!(self.id, Some(JsonRpcId::Number(n)) if n == correlation_id)
    }

    /// Collapse the response into its outcome.
    ///
    /// `error` wins if both fields are present. A response with neither
    /// (including `"result": null`) yields `Value::Null`.
    pub fn into_outcome(self) -> Result<Value, JsonRpcError> {
        match (self.error, self.result) {
            (Some(err), _) => Err(err),
            (None, Some(result)) => Ok(result),
            (None, None) => Ok(Value::Null),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Message Classification
// ─────────────────────────────────────────────────────────────────────────────

/// Which side of the bridge a message was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// The local caller on stdin. `"jsonrpc": "2.0"` is mandatory.
    Local,
    /// The remote endpoint. The version member is not checked.
    Remote,
}

/// Shape of a JSON-RPC message, decided by which of `id` / `method` it has.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    /// `id` and `method`
    Request { id: JsonRpcId, method: String },
    /// `id` only
    Response { id: JsonRpcId },
    /// `method` only
    Notification { method: String },
}

/// Why a message could not be classified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    /// Local message without a `jsonrpc` member.
    #[error("missing jsonrpc field")]
    MissingVersion,
    /// Local message whose `jsonrpc` member is not `"2.0"`.
    #[error("unsupported JSON-RPC version: {0}")]
    UnsupportedVersion(String),
    /// `id` is a float, boolean, array or object.
    #[error("invalid id field")]
    InvalidId,
    /// Neither `id` nor a string `method`.
    #[error("message has neither id nor method")]
    Unclassifiable,
}

/// Classify a parsed message read from `origin`.
///
/// # Errors
///
/// See [`ClassifyError`]. The version variants only occur for
/// [`Origin::Local`].
pub fn classify(value: &Value, origin: Origin) -> Result<MessageKind, ClassifyError> {
    if origin == Origin::Local {
        match value.get("jsonrpc") {
            None => return Err(ClassifyError::MissingVersion),
            Some(Value::String(v)) if v == JSONRPC_VERSION => {}
            Some(Value::String(v)) => return Err(ClassifyError::UnsupportedVersion(v.clone())),
            Some(other) => return Err(ClassifyError::UnsupportedVersion(other.to_string())),
        }
    }

    let id = value
        .get("id")
        .map(JsonRpcId::deserialize)
        .transpose()
        .map_err(|_| ClassifyError::InvalidId)?;
    let method = value.get("method").and_then(Value::as_str).map(String::from);

    match (id, method) {
        (Some(id), Some(method)) => Ok(MessageKind::Request { id, method }),
        (Some(id), None) => Ok(MessageKind::Response { id }),
        (None, Some(method)) => Ok(MessageKind::Notification { method }),
        (None, None) => Err(ClassifyError::Unclassifiable),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_outbound_wire_shape() {
        let env = OutboundEnvelope::new(7, "tools/call", Some(json!({"name": "echo"})));
        let wire = serde_json::to_value(&env).unwrap();
        assert_eq!(
            wire,
            json!({"jsonrpc": "2.0", "id": 7, "method": "tools/call", "params": {"name": "echo"}})
        );
    }

    #[test]
    fn test_outbound_without_params_omits_field() {
        let env = OutboundEnvelope::new(1, "tools/list", None);
        let wire = serde_json::to_string(&env).unwrap();
        assert!(!wire.contains("params"));
    }

    #[test]
    fn test_outbound_debug_redacts_params() {
        let env = OutboundEnvelope::new(1, "tools/call", Some(json!({"secret": "hunter2"})));
        let debug = format!("{env:?}");
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_id_type_preserved() {
        let resp = JsonRpcResponse::success(Some(JsonRpcId::String("a-1".into())), json!({}));
        let wire = serde_json::to_value(&resp).unwrap();
        assert_eq!(wire["id"], "a-1");

        let resp = JsonRpcResponse::success(Some(JsonRpcId::Number(5)), json!({}));
        let wire = serde_json::to_value(&resp).unwrap();
        assert_eq!(wire["id"], 5);
    }

    #[test]
    fn test_missing_id_serializes_as_null() {
        let resp = JsonRpcResponse::error(None, JsonRpcError::new(-32700, "Parse error"));
        let wire = serde_json::to_value(&resp).unwrap();
        assert!(wire["id"].is_null());
        assert!(wire.get("result").is_none());
    }

    #[test]
    fn test_float_id_rejected() {
        let result: Result<JsonRpcResponse, _> =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1.5,"result":{}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_answers_matches_numeric_id_only() {
        let resp: JsonRpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":3,"result":{}}"#).unwrap();
        assert!(resp.answers(3));
        assert!(!resp.answers(4));

        let resp: JsonRpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":"3","result":{}}"#).unwrap();
        assert!(!resp.answers(3));
    }

    #[test]
    fn test_into_outcome() {
        let ok: JsonRpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":{"tools":[]}}"#).unwrap();
        assert_eq!(ok.into_outcome().unwrap(), json!({"tools": []}));

        let err: JsonRpcResponse = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"boom"}}"#,
        )
        .unwrap();
        assert_eq!(err.into_outcome().unwrap_err().message, "boom");

        let null: JsonRpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":null}"#).unwrap();
        assert_eq!(null.into_outcome().unwrap(), Value::Null);
    }

    #[test]
    fn test_classify_shapes() {
        let req = json!({"jsonrpc": "2.0", "id": "a", "method": "ping"});
        assert_eq!(
            classify(&req, Origin::Local).unwrap(),
            MessageKind::Request {
                id: JsonRpcId::String("a".into()),
                method: "ping".into()
            }
        );

        let resp = json!({"jsonrpc": "2.0", "id": 5, "error": {"code": -1, "message": "x"}});
        assert_eq!(
            classify(&resp, Origin::Remote).unwrap(),
            MessageKind::Response {
                id: JsonRpcId::Number(5)
            }
        );

        let note = json!({"jsonrpc": "2.0", "method": "notifications/progress"});
        assert!(matches!(
            classify(&note, Origin::Remote).unwrap(),
            MessageKind::Notification { .. }
        ));

        assert_eq!(
            classify(&json!({"jsonrpc": "2.0"}), Origin::Local),
            Err(ClassifyError::Unclassifiable)
        );
    }

    #[test]
    fn test_local_messages_need_version() {
        let bare = json!({"id": 1, "method": "ping"});
        assert_eq!(classify(&bare, Origin::Local), Err(ClassifyError::MissingVersion));

        let old = json!({"jsonrpc": "1.0", "id": 1, "method": "ping"});
        assert_eq!(
            classify(&old, Origin::Local),
            Err(ClassifyError::UnsupportedVersion("1.0".into()))
        );

        let numeric = json!({"jsonrpc": 2, "id": 1, "method": "ping"});
        assert_eq!(
            classify(&numeric, Origin::Local),
            Err(ClassifyError::UnsupportedVersion("2".into()))
        );
    }

    #[test]
    fn test_remote_messages_without_version() {
        let resp = json!({"id": 1, "result": {"ok": true}});
        assert_eq!(
            classify(&resp, Origin::Remote).unwrap(),
            MessageKind::Response {
                id: JsonRpcId::Number(1)
            }
        );

        let note = json!({"method": "notifications/progress", "params": {}});
        assert!(matches!(
            classify(&note, Origin::Remote).unwrap(),
            MessageKind::Notification { .. }
        ));
    }

    #[test]
    fn test_classify_rejects_bad_ids() {
        for id in [json!(true), json!(2.5), json!([1])] {
            let msg = json!({"jsonrpc": "2.0", "id": id, "result": {}});
            assert_eq!(classify(&msg, Origin::Remote), Err(ClassifyError::InvalidId));
        }
    }
}
