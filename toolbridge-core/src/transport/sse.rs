//! Event-stream reassembly.
//!
//! Rebuilds the terminal JSON-RPC response for one outbound call from a
//! `text/event-stream` body that arrives in arbitrary byte chunks. Progress
//! notifications seen along the way are handed to the [`ProgressRelay`]
//! before the terminal response is returned.
//!
//! Framing is line-based: only `data:` lines carry messages, one JSON value
//! per line. `event:`, `id:`, `retry:`, comments and blank lines are
//! skipped. Bytes are buffered raw so a multi-byte UTF-8 sequence split
//! across chunks decodes correctly.

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::BridgeError;
use crate::protocol::{NOTIFICATION_PROGRESS, ProgressEvent};
use crate::relay::ProgressRelay;
use crate::transport::jsonrpc::{InboundEnvelope, JsonRpcId, MessageKind, Origin, classify};

const DATA_FIELD: &[u8] = b"data:";

/// Line-buffering state machine for one event-stream body.
///
/// Feed chunks with [`feed`](Self::feed), flush the trailing partial line
/// with [`finish`](Self::finish), then take the outcome with
/// [`into_result`](Self::into_result).
#[derive(Debug)]
pub struct StreamReassembler {
    correlation_id: i64,
    max_line_bytes: usize,
    line: Vec<u8>,
    overflowed: bool,
    bytes_seen: u64,
    terminal: Option<InboundEnvelope>,
}

impl StreamReassembler {
    /// Reassembler for the call with `correlation_id`. Lines longer than
    /// `max_line_bytes` are discarded.
    pub fn new(correlation_id: i64, max_line_bytes: usize) -> Self {
        Self {
            correlation_id,
            max_line_bytes,
            line: Vec::new(),
            overflowed: false,
            bytes_seen: 0,
            terminal: None,
        }
    }

    /// Consume one chunk. Returns the progress events completed by it, in
    /// arrival order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<ProgressEvent> {
        self.bytes_seen += chunk.len() as u64;
        let mut events = Vec::new();
        let mut rest = chunk;
        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            self.append(&rest[..pos]);
            self.end_line(&mut events);
            rest = &rest[pos + 1..];
        }
        self.append(rest);
        events
    }

    /// Process whatever is left in the line buffer once the stream closes.
    pub fn finish(&mut self) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        if !self.line.is_empty() || self.overflowed {
            self.end_line(&mut events);
        }
        events
    }

    /// Whether the terminal response has been captured.
    pub fn is_complete(&self) -> bool {
        self.terminal.is_some()
    }

    /// The captured terminal response.
    ///
    /// # Errors
    ///
    /// [`BridgeError::NoResponseBody`] if the stream carried no bytes at
    /// all, [`BridgeError::NoTerminalResult`] if it carried bytes but no
    /// response with the expected ID.
    pub fn into_result(self) -> Result<InboundEnvelope, BridgeError> {
        match self.terminal {
            Some(envelope) => Ok(envelope),
            None if self.bytes_seen == 0 => Err(BridgeError::NoResponseBody),
            None => Err(BridgeError::NoTerminalResult {
                correlation_id: self.correlation_id,
            }),
        }
    }

    fn append(&mut self, bytes: &[u8]) {
        if self.overflowed {
            return;
        }
        if self.line.len() + bytes.len() > self.max_line_bytes {
            warn!(
                correlation_id = self.correlation_id,
                max_line_bytes = self.max_line_bytes,
                "Event-stream line exceeds size limit, discarding"
            );
            self.overflowed = true;
            self.line = Vec::new();
            return;
        }
        self.line.extend_from_slice(bytes);
    }

    fn end_line(&mut self, events: &mut Vec<ProgressEvent>) {
        let line = std::mem::take(&mut self.line);
        if std::mem::replace(&mut self.overflowed, false) {
            return;
        }
        if let Some(event) = self.process_line(&line) {
            events.push(event);
        }
    }

    fn process_line(&mut self, line: &[u8]) -> Option<ProgressEvent> {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        let payload = line.strip_prefix(DATA_FIELD)?;
        let payload = payload.strip_prefix(b" ").unwrap_or(payload);
        if payload.iter().all(u8::is_ascii_whitespace) {
            return None;
        }

        let value: Value = match serde_json::from_slice(payload) {
            Ok(v) => v,
            Err(e) => {
                warn!(
                    correlation_id = self.correlation_id,
                    error = %e,
                    "Skipping unparseable event-stream data line"
                );
                return None;
            }
        };

        match classify(&value, Origin::Remote) {
            Ok(MessageKind::Notification { method }) if method == NOTIFICATION_PROGRESS => {
                self.progress(value)
            }
            Ok(MessageKind::Notification { method }) => {
                debug!(correlation_id = self.correlation_id, method = %method, "Ignoring notification");
                None
            }
            Ok(MessageKind::Response { id }) => {
                self.response(id, value);
                None
            }
            Ok(MessageKind::Request { method, .. }) => {
                debug!(
                    correlation_id = self.correlation_id,
                    method = %method,
                    "Ignoring server-initiated request"
                );
                None
            }
            Err(e) => {
                warn!(
                    correlation_id = self.correlation_id,
                    error = %e,
                    "Skipping malformed event-stream message"
                );
                None
            }
        }
    }

    fn progress(&self, value: Value) -> Option<ProgressEvent> {
        if self.terminal.is_some() {
            debug!(correlation_id = self.correlation_id, "Dropping progress after terminal response");
            return None;
        }
        let params = value.get("params").cloned().unwrap_or(Value::Null);
        match serde_json::from_value::<ProgressEvent>(params) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!(
                    correlation_id = self.correlation_id,
                    error = %e,
                    "Skipping malformed progress notification"
                );
                None
            }
        }
    }

    fn response(&mut self, id: JsonRpcId, value: Value) {
        if id != JsonRpcId::Number(self.correlation_id) {
            debug!(
                correlation_id = self.correlation_id,
                stray_id = %id,
                "Discarding response for another request"
            );
            return;
        }
        if self.terminal.is_some() {
            debug!(correlation_id = self.correlation_id, "Ignoring duplicate terminal response");
            return;
        }
        match serde_json::from_value::<InboundEnvelope>(value) {
            Ok(envelope) => self.terminal = Some(envelope),
            Err(e) => warn!(
                correlation_id = self.correlation_id,
                error = %e,
                "Skipping malformed terminal response"
            ),
        }
    }
}

/// Drive a [`StreamReassembler`] over `body`, relaying progress as it
/// arrives.
///
/// The whole stream is drained; the first response whose ID equals
/// `correlation_id` wins. `body` is consumed and dropped on every path.
///
/// # Errors
///
/// A read error before the terminal response is captured is returned as-is.
/// Otherwise see [`StreamReassembler::into_result`].
#[tracing::instrument(skip(body, relay))]
pub async fn reassemble<S>(
    mut body: S,
    correlation_id: i64,
    max_line_bytes: usize,
    relay: &ProgressRelay,
) -> Result<InboundEnvelope, BridgeError>
where
    S: Stream<Item = Result<Bytes, BridgeError>> + Unpin,
{
    let mut reassembler = StreamReassembler::new(correlation_id, max_line_bytes);

    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) if reassembler.is_complete() => {
                warn!(error = %e, "Event stream failed after terminal response");
                break;
            }
            Err(e) => return Err(e),
        };
        for event in reassembler.feed(&chunk) {
            relay.relay(event).await;
        }
    }

    for event in reassembler.finish() {
        relay.relay(event).await;
    }

    reassembler.into_result()
}
