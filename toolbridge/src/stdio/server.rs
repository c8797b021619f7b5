//! Local stdio MCP server.
//!
//! Reads NDJSON requests from the caller, answers the lifecycle methods
//! locally, and hands `tools/list` / `tools/call` to the [`Bridge`]. Each
//! request runs on its own task so a slow tool call never blocks the next
//! line; replies and progress notifications share one serialized writer so
//! lines are never interleaved.
//!
//! stdout carries protocol traffic only. All diagnostics go through
//! `tracing`, which `main` points at stderr.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use toolbridge_core::config::{BridgeConfig, PROTOCOL_VERSION};
use toolbridge_core::protocol::{
    CallToolParams, INITIALIZE, NOTIFICATION_CANCELLED, NOTIFICATION_INITIALIZED, PING,
    TOOLS_CALL, TOOLS_LIST, is_local_method,
};
use toolbridge_core::relay::{NotificationSink, SinkError};
use toolbridge_core::transport::{JsonRpcResponse, MessageKind};
use toolbridge_core::{Bridge, BridgeError};

use crate::error::{FramingError, StdioError};
use crate::stdio::ndjson::{MAX_MESSAGE_BYTES, bounded_read_line, parse_stdio_message};

/// Name reported in `serverInfo`.
pub const SERVER_NAME: &str = "toolbridge";

// ─────────────────────────────────────────────────────────────────────────────
// Shared Stdout Writer
// ─────────────────────────────────────────────────────────────────────────────

/// Serialized NDJSON writer shared by every request task.
pub struct StdioWriter<W> {
    inner: Mutex<W>,
}

impl<W: AsyncWrite + Unpin + Send> StdioWriter<W> {
    /// Wrap `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            inner: Mutex::new(writer),
        }
    }

    /// Write one message as a single line and flush.
    pub async fn write_message<T: Serialize>(&self, message: &T) -> std::io::Result<()> {
        let mut line = serde_json::to_vec(message).map_err(std::io::Error::other)?;
        line.push(b'\n');
        let mut guard = self.inner.lock().await;
        guard.write_all(&line).await?;
        guard.flush().await
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> NotificationSink for StdioWriter<W> {
    async fn send_notification(&self, notification: Value) -> Result<(), SinkError> {
        self.write_message(&notification)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::BrokenPipe => SinkError::Closed,
                _ => SinkError::Write(e.to_string()),
            })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Entry Points
// ─────────────────────────────────────────────────────────────────────────────

/// Serve MCP over `reader`/`writer` until `reader` reaches EOF.
///
/// # Errors
///
/// Returns [`StdioError::Config`] if the HTTP client cannot be built and
/// [`StdioError::StdioIo`] if reading fails.
pub async fn run_stdio_server<R, W>(
    config: BridgeConfig,
    reader: R,
    writer: W,
) -> Result<(), StdioError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let out = Arc::new(StdioWriter::new(writer));
    let bridge = Arc::new(Bridge::from_config(config, out.clone())?);
    serve(bridge, out, BufReader::new(reader)).await
}

/// Read loop: dispatch every line, then wait for in-flight requests once
/// the input closes.
///
/// # Errors
///
/// Returns [`StdioError::StdioIo`] if reading fails.
pub async fn serve<R, W>(
    bridge: Arc<Bridge>,
    out: Arc<StdioWriter<W>>,
    mut reader: R,
) -> Result<(), StdioError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let mut tasks = JoinSet::new();
    let mut raw_buf = Vec::new();

    loop {
        raw_buf.clear();

        let bytes_read = match bounded_read_line(&mut reader, &mut raw_buf, MAX_MESSAGE_BYTES).await
        {
            Ok(n) => n,
            Err(FramingError::Io(e)) => return Err(StdioError::StdioIo(e)),
            Err(e) => {
                warn!(error = %e, error_type = e.error_type(), "Rejecting stdin message");
                reply(&out, JsonRpcResponse::error(None, e.to_jsonrpc_error())).await;
                continue;
            }
        };

        if bytes_read == 0 {
            debug!("stdin closed");
            break;
        }

        let line = String::from_utf8_lossy(&raw_buf);
        if line.trim().is_empty() {
            continue;
        }

        let message = match parse_stdio_message(&line) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, error_type = e.error_type(), "Rejecting stdin message");
                reply(&out, JsonRpcResponse::error(None, e.to_jsonrpc_error())).await;
                continue;
            }
        };

        match message.kind {
            MessageKind::Request { id, method } => {
                debug!(
                    id = %id,
                    method = %method,
                    local = is_local_method(&method),
                    "Dispatching request"
                );
                let bridge = bridge.clone();
                let out = out.clone();
                let params = message.params;
                tasks.spawn(async move {
                    let response = match handle_request(&bridge, &method, params).await {
                        Ok(result) => JsonRpcResponse::success(Some(id), result),
                        Err(e) => {
                            warn!(
                                method = %method,
                                error = %e,
                                error_type = e.error_type_name(),
                                "Request failed"
                            );
                            JsonRpcResponse::error(Some(id), e.to_jsonrpc_error())
                        }
                    };
                    reply(&out, response).await;
                });
            }
            MessageKind::Notification { method } => match method.as_str() {
                NOTIFICATION_INITIALIZED => info!("Client initialized"),
                NOTIFICATION_CANCELLED => debug!("Ignoring cancellation notice"),
                other => debug!(method = %other, "Ignoring notification"),
            },
            MessageKind::Response { id } => {
                debug!(id = %id, "Ignoring response from caller");
            }
        }

        // Reap finished tasks so the set does not grow without bound.
        while tasks.try_join_next().is_some() {}
    }

    let in_flight = tasks.len();
    if in_flight > 0 {
        info!(in_flight, "Waiting for in-flight requests");
    }
    while tasks.join_next().await.is_some() {}
    Ok(())
}

async fn reply<W: AsyncWrite + Unpin + Send>(out: &StdioWriter<W>, response: JsonRpcResponse) {
    if let Err(e) = out.write_message(&response).await {
        warn!(error = %e, "Failed to write response to stdout");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Method Dispatch
// ─────────────────────────────────────────────────────────────────────────────

/// Answer one request. Lifecycle methods are handled here; tool methods go
/// to the bridge.
async fn handle_request(
    bridge: &Bridge,
    method: &str,
    params: Option<Value>,
) -> Result<Value, BridgeError> {
    match method {
        INITIALIZE => Ok(initialize_result(params.as_ref())),
        PING => Ok(json!({})),
        TOOLS_LIST => {
            let cursor = params
                .as_ref()
                .and_then(|p| p.get("cursor"))
                .and_then(Value::as_str)
                .map(String::from);
            let listing = bridge.list_tools(cursor).await?;
            to_result(&listing)
        }
        TOOLS_CALL => {
            let params = params.ok_or_else(|| BridgeError::InvalidParams {
                details: "tools/call requires params".to_string(),
            })?;
            let call: CallToolParams =
                serde_json::from_value(params).map_err(|e| BridgeError::InvalidParams {
                    details: e.to_string(),
                })?;
            let result = bridge.call_tool(call).await;
            to_result(&result)
        }
        other => Err(BridgeError::MethodNotFound {
            method: other.to_string(),
        }),
    }
}

fn to_result<T: Serialize>(value: &T) -> Result<Value, BridgeError> {
    serde_json::to_value(value).map_err(|e| BridgeError::InternalError {
        details: e.to_string(),
    })
}

/// `initialize` result: echo the caller's protocol version when given.
fn initialize_result(params: Option<&Value>) -> Value {
    let protocol_version = params
        .and_then(|p| p.get("protocolVersion"))
        .and_then(Value::as_str)
        .unwrap_or(PROTOCOL_VERSION);

    json!({
        "protocolVersion": protocol_version,
        "capabilities": {
            "tools": { "listChanged": false }
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION"),
        }
    })
}
