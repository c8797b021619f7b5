//! Bridge orchestrator.
//!
//! Exposes the two operations the local caller can reach, `tools/list` and
//! `tools/call`, and turns each into exactly one outbound exchange. The
//! orchestrator owns correlation-ID assignment and the pending-call map;
//! the forwarder owns the HTTP exchange.
//!
//! Failure shaping differs by operation: a failed listing surfaces as a
//! JSON-RPC error, while a failed invocation comes back as a normal
//! `CallToolResult` with `isError: true` so the agent can read the reason.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use serde_json::{Map, Value, json};
use tracing::{info, warn};

use crate::config::{BridgeConfig, ConfigError};
use crate::error::BridgeError;
use crate::protocol::{
    CallToolParams, CallToolResult, ListToolsResult, ProgressToken, TOOLS_CALL, TOOLS_LIST,
};
use crate::relay::{NotificationSink, ProgressRelay};
use crate::transport::jsonrpc::{InboundEnvelope, OutboundEnvelope};
use crate::transport::pending::PendingCalls;
use crate::transport::upstream::{UpstreamClient, UpstreamForwarder};

/// Key under `_meta` that carries the progress token.
const PROGRESS_TOKEN_KEY: &str = "progressToken";

/// The orchestrator shared by every in-flight local request.
pub struct Bridge {
    forwarder: Arc<dyn UpstreamForwarder>,
    relay: ProgressRelay,
    pending: PendingCalls,
    next_id: AtomicI64,
}

impl Bridge {
    /// Create a bridge over an arbitrary forwarder.
    pub fn new(forwarder: Arc<dyn UpstreamForwarder>, sink: Arc<dyn NotificationSink>) -> Self {
        let pending = PendingCalls::new();
        Self {
            forwarder,
            relay: ProgressRelay::new(sink, pending.clone()),
            pending,
            next_id: AtomicI64::new(1),
        }
    }

    /// Create a bridge that forwards over HTTP with `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the HTTP client cannot be built.
    pub fn from_config(
        config: BridgeConfig,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<Self, ConfigError> {
        let client = UpstreamClient::new(config)?;
        Ok(Self::new(Arc::new(client), sink))
    }

    /// Outstanding outbound calls.
    pub fn pending(&self) -> &PendingCalls {
        &self.pending
    }

    /// Next correlation ID. Strictly increasing, never reused.
    pub fn next_correlation_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Fetch the remote tool catalog.
    ///
    /// `cursor` is relayed for paginated catalogs.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Remote`] carrying the remote's (or the forwarder's)
    /// error verbatim, or [`BridgeError::MalformedResponse`] if the result
    /// is not a tool listing.
    #[tracing::instrument(skip(self))]
    pub async fn list_tools(&self, cursor: Option<String>) -> Result<ListToolsResult, BridgeError> {
        let params = cursor.map(|c| json!({ "cursor": c }));
        let inbound = self.dispatch(TOOLS_LIST, params, None).await;

        match inbound.into_outcome()? {
            Value::Null => Ok(ListToolsResult::default()),
            result => {
                let listing: ListToolsResult = serde_json::from_value(result).map_err(|e| {
                    warn!(error = %e, "Remote returned an invalid tools/list result");
                    BridgeError::MalformedResponse {
                        details: format!("invalid tools/list result: {e}"),
                    }
                })?;
                info!(tool_count = listing.tools.len(), "Fetched remote tool catalog");
                Ok(listing)
            }
        }
    }

    /// Invoke a remote tool.
    ///
    /// Never fails: every failure is rendered as an error result. A progress
    /// token is taken from `_meta.progressToken` or generated, and attached
    /// to the outbound call so the remote's progress can be relayed.
    #[tracing::instrument(skip(self, params), fields(tool = %params.name))]
    pub async fn call_tool(&self, params: CallToolParams) -> CallToolResult {
        let CallToolParams {
            name,
            arguments,
            meta,
        } = params;

        let mut meta = meta.unwrap_or_default();
        let token = meta
            .get(PROGRESS_TOKEN_KEY)
            .and_then(ProgressToken::from_value)
            .unwrap_or_else(ProgressToken::generate);
        meta.insert(PROGRESS_TOKEN_KEY.to_string(), json!(token));

        let outbound_params = json!({
            "name": name,
            "arguments": arguments.unwrap_or_else(|| Value::Object(Map::new())),
            "_meta": meta,
        });

        let inbound = self
            .dispatch(TOOLS_CALL, Some(outbound_params), Some(token))
            .await;

        match inbound.into_outcome() {
            Ok(Value::Null) => CallToolResult::default(),
            Ok(result) => serde_json::from_value(result).unwrap_or_else(|e| {
                warn!(error = %e, "Remote returned an invalid tools/call result");
                CallToolResult::error_text(&format!("invalid tools/call result: {e}"))
            }),
            Err(err) => {
                info!(code = err.code, error = %err.message, "Tool call failed");
                CallToolResult::error_text(&err.message)
            }
        }
    }

    /// Run one outbound exchange with its pending slot held for the
    /// duration.
    async fn dispatch(
        &self,
        method: &str,
        params: Option<Value>,
        progress_token: Option<ProgressToken>,
    ) -> InboundEnvelope {
        let correlation_id = self.next_correlation_id();
        let _slot = self.pending.register(correlation_id, method, progress_token);
        let envelope = OutboundEnvelope::new(correlation_id, method, params);
        self.forwarder.forward(&envelope, &self.relay).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::ValidatedUrl;
    use crate::error::jsonrpc::JsonRpcError;
    use crate::protocol::ProgressEvent;
    use crate::relay::test_support::RecordingSink;
    use crate::transport::jsonrpc::JsonRpcResponse;

    type Responder = dyn Fn(&OutboundEnvelope) -> InboundEnvelope + Send + Sync;

    /// Forwarder that records envelopes and answers from a closure.
    struct ScriptedForwarder {
        seen: Mutex<Vec<Value>>,
        respond: Box<Responder>,
        progress_steps: usize,
    }

    impl ScriptedForwarder {
        fn new(
            respond: impl Fn(&OutboundEnvelope) -> InboundEnvelope + Send + Sync + 'static,
        ) -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
                respond: Box::new(respond),
                progress_steps: 0,
            }
        }

        fn with_progress(mut self, steps: usize) -> Self {
            self.progress_steps = steps;
            self
        }

        fn seen(&self) -> Vec<Value> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl UpstreamForwarder for ScriptedForwarder {
        async fn forward(
            &self,
            envelope: &OutboundEnvelope,
            relay: &ProgressRelay,
        ) -> InboundEnvelope {
            self.seen
                .lock()
                .unwrap()
                .push(serde_json::to_value(envelope).unwrap());
            let token = envelope
                .params
                .as_ref()
                .and_then(|p| p.pointer("/_meta/progressToken"))
                .and_then(ProgressToken::from_value);
            if let Some(token) = token {
                for step in 1..=self.progress_steps {
                    relay
                        .relay(ProgressEvent {
                            progress_token: token.clone(),
                            progress: step as f64,
                            total: Some(self.progress_steps as f64),
                            message: None,
                        })
                        .await;
                }
            }
            (self.respond)(envelope)
        }
    }

    fn ok(envelope: &OutboundEnvelope, result: Value) -> InboundEnvelope {
        JsonRpcResponse::success(Some(envelope.id()), result)
    }

    fn bridge_with(forwarder: Arc<ScriptedForwarder>) -> (Bridge, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        (Bridge::new(forwarder, sink.clone()), sink)
    }

    fn call(name: &str, arguments: Option<Value>, meta: Option<Value>) -> CallToolParams {
        CallToolParams {
            name: name.to_string(),
            arguments,
            meta: meta.and_then(|m| m.as_object().cloned()),
        }
    }

    #[test]
    fn test_correlation_ids_strictly_increase() {
        let forwarder = Arc::new(ScriptedForwarder::new(|e| ok(e, Value::Null)));
        let (bridge, _) = bridge_with(forwarder);
        let ids: Vec<i64> = (0..100).map(|_| bridge.next_correlation_id()).collect();
        assert!(ids.windows(2).all(|w| w[1] > w[0]));
    }

    #[tokio::test]
    async fn test_list_tools_returns_catalog() {
        let forwarder = Arc::new(ScriptedForwarder::new(|e| {
            ok(e, json!({"tools": [{"name": "search", "inputSchema": {"type": "object"}}]}))
        }));
        let (bridge, _) = bridge_with(forwarder.clone());

        let listing = bridge.list_tools(None).await.unwrap();
        assert_eq!(listing.tools.len(), 1);
        assert_eq!(listing.tools[0].name, "search");

        let seen = forwarder.seen();
        assert_eq!(seen[0]["method"], "tools/list");
        assert!(seen[0].get("params").is_none());
        assert!(bridge.pending().is_empty());
    }

    #[tokio::test]
    async fn test_list_tools_relays_cursor() {
        let forwarder = Arc::new(ScriptedForwarder::new(|e| ok(e, json!({"tools": []}))));
        let (bridge, _) = bridge_with(forwarder.clone());
        bridge.list_tools(Some("page-2".into())).await.unwrap();
        assert_eq!(forwarder.seen()[0]["params"]["cursor"], "page-2");
    }

    #[tokio::test]
    async fn test_list_tools_remote_error_verbatim() {
        let forwarder = Arc::new(ScriptedForwarder::new(|e| {
            JsonRpcResponse::error(Some(e.id()), JsonRpcError::new(-32042, "quota exhausted"))
        }));
        let (bridge, _) = bridge_with(forwarder);

        let err = bridge.list_tools(None).await.unwrap_err();
        assert_eq!(err.to_string(), "quota exhausted");
        assert_eq!(err.to_jsonrpc_error().code, -32042);
    }

    #[tokio::test]
    async fn test_list_tools_null_list_is_empty() {
        let forwarder = Arc::new(ScriptedForwarder::new(|e| ok(e, json!({"tools": null}))));
        let (bridge, _) = bridge_with(forwarder);
        let listing = bridge.list_tools(None).await.unwrap();
        assert!(listing.tools.is_empty());
    }

    #[tokio::test]
    async fn test_list_tools_malformed_result() {
        let forwarder = Arc::new(ScriptedForwarder::new(|e| ok(e, json!({"tools": "nope"}))));
        let (bridge, _) = bridge_with(forwarder);
        let err = bridge.list_tools(None).await.unwrap_err();
        assert!(matches!(err, BridgeError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn test_call_tool_builds_envelope() {
        let forwarder = Arc::new(ScriptedForwarder::new(|e| {
            ok(e, json!({"content": [{"type": "text", "text": "pong"}]}))
        }));
        let (bridge, _) = bridge_with(forwarder.clone());

        let result = bridge.call_tool(call("echo", None, None)).await;
        assert_eq!(result.content[0].as_text(), Some("pong"));
        assert_eq!(result.is_error, None);

        let seen = forwarder.seen();
        assert_eq!(seen[0]["method"], "tools/call");
        assert_eq!(seen[0]["params"]["name"], "echo");
        assert_eq!(seen[0]["params"]["arguments"], json!({}));
        assert!(seen[0]["params"]["_meta"]["progressToken"].is_string());
    }

    #[tokio::test]
    async fn test_call_tool_keeps_caller_token_and_meta() {
        let forwarder = Arc::new(ScriptedForwarder::new(|e| ok(e, json!({"content": []}))));
        let (bridge, _) = bridge_with(forwarder.clone());

        bridge
            .call_tool(call(
                "echo",
                Some(json!({"x": 1})),
                Some(json!({"progressToken": 17, "traceId": "abc"})),
            ))
            .await;

        let params = &forwarder.seen()[0]["params"];
        assert_eq!(params["arguments"], json!({"x": 1}));
        assert_eq!(params["_meta"]["progressToken"], 17);
        assert_eq!(params["_meta"]["traceId"], "abc");
    }

    #[tokio::test]
    async fn test_call_tool_failure_becomes_error_result() {
        let forwarder = Arc::new(ScriptedForwarder::new(|e| {
            JsonRpcResponse::error(Some(e.id()), JsonRpcError::new(-32602, "unknown tool: nope"))
        }));
        let (bridge, _) = bridge_with(forwarder);

        let result = bridge.call_tool(call("nope", None, None)).await;
        assert_eq!(result.is_error, Some(true));
        assert_eq!(result.content.len(), 1);
        assert_eq!(result.content[0].as_text(), Some("Error: unknown tool: nope"));
    }

    #[tokio::test]
    async fn test_call_tool_null_result_is_empty() {
        let forwarder = Arc::new(ScriptedForwarder::new(|e| ok(e, Value::Null)));
        let (bridge, _) = bridge_with(forwarder);
        let result = bridge.call_tool(call("noop", None, None)).await;
        assert!(result.content.is_empty());
        assert_eq!(result.is_error, None);
    }

    #[tokio::test]
    async fn test_progress_relayed_before_result() {
        let forwarder = Arc::new(
            ScriptedForwarder::new(|e| ok(e, json!({"content": []}))).with_progress(3),
        );
        let (bridge, sink) = bridge_with(forwarder);

        bridge
            .call_tool(call("slow", None, Some(json!({"progressToken": "caller-tok"}))))
            .await;

        let sent = sink.notifications();
        assert_eq!(sent.len(), 3);
        for (i, n) in sent.iter().enumerate() {
            assert_eq!(n["params"]["progressToken"], "caller-tok");
            assert_eq!(n["params"]["progress"], (i + 1) as f64);
        }
        assert!(bridge.pending().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_calls_get_their_own_results() {
        let forwarder = Arc::new(ScriptedForwarder::new(|e| {
            let name = e.params.as_ref().unwrap()["name"].clone();
            ok(e, json!({"content": [{"type": "text", "text": name}]}))
        }));
        let (bridge, _) = bridge_with(forwarder.clone());

        let (a, b) = tokio::join!(
            bridge.call_tool(call("alpha", None, None)),
            bridge.call_tool(call("beta", None, None)),
        );
        assert_eq!(a.content[0].as_text(), Some("alpha"));
        assert_eq!(b.content[0].as_text(), Some("beta"));

        let ids: Vec<i64> = forwarder
            .seen()
            .iter()
            .map(|e| e["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
    }

    #[tokio::test]
    async fn test_end_to_end_over_http_stream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": "tools/call"})))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                concat!(
                    "data: {\"jsonrpc\":\"2.0\",\"method\":\"notifications/progress\",\"params\":{\"progressToken\":\"e2e\",\"progress\":50,\"total\":100}}\n\n",
                    "data: {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{\"content\":[{\"type\":\"text\",\"text\":\"done\"}]}}\n\n",
                ),
                "text/event-stream",
            ))
            .mount(&server)
            .await;

        let config = BridgeConfig::with_validated_url(
            "tb_test_key",
            ValidatedUrl::assume_valid(&format!("{}/mcp", server.uri())),
        );
        let sink = Arc::new(RecordingSink::default());
        let bridge = Bridge::from_config(config, sink.clone()).unwrap();

        let result = bridge
            .call_tool(call("long", None, Some(json!({"progressToken": "e2e"}))))
            .await;
        assert_eq!(result.content[0].as_text(), Some("done"));

        let sent = sink.notifications();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["params"]["progress"], 50.0);
    }

    #[tokio::test]
    async fn test_end_to_end_http_failure_is_tool_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let config = BridgeConfig::with_validated_url(
            "tb_test_key",
            ValidatedUrl::assume_valid(&format!("{}/mcp", server.uri())),
        );
        let bridge = Bridge::from_config(config, Arc::new(RecordingSink::default())).unwrap();

        let result = bridge.call_tool(call("anything", None, None)).await;
        assert_eq!(result.is_error, Some(true));
        assert_eq!(
            result.content[0].as_text(),
            Some("Error: HTTP 401: invalid api key")
        );

        let err = bridge.list_tools(None).await.unwrap_err();
        assert_eq!(err.to_jsonrpc_error().code, crate::error::CODE_HTTP_STATUS);
    }
}
