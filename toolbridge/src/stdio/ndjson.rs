//! NDJSON framing for the stdio transport.
//!
//! One JSON-RPC message per line on stdin, one per line on stdout. This
//! module holds the pure line parser plus the bounded line reader used by
//! the server's read loop.

use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use toolbridge_core::transport::{ClassifyError, MessageKind, Origin, classify};

use crate::error::FramingError;

/// Maximum NDJSON message size (10 MB).
///
/// Lines exceeding this limit are rejected before JSON parsing to prevent
/// allocation of oversized `serde_json::Value` trees from crafted input.
pub const MAX_MESSAGE_BYTES: usize = 10 * 1024 * 1024;

/// A parsed NDJSON line from stdin.
#[derive(Debug, Clone)]
pub struct StdioMessage {
    /// Classified message kind (Request, Response, or Notification).
    pub kind: MessageKind,
    /// The `params` field, if present.
    pub params: Option<serde_json::Value>,
}

/// Parse a single NDJSON line into a [`StdioMessage`].
///
/// Performs size validation, JSON parsing, batch rejection, and JSON-RPC
/// classification in sequence.
///
/// # Errors
///
/// Returns [`FramingError`] for:
/// - Oversized messages (`MessageTooLarge`), checked before JSON parsing
/// - Invalid JSON (`MalformedJson`)
/// - JSON arrays (`UnsupportedBatch`)
/// - Missing `jsonrpc` field (`MissingVersion`)
/// - Wrong `jsonrpc` version (`UnsupportedVersion`)
/// - Invalid `id` field type (`MalformedJson`)
/// - Unclassifiable messages (`MalformedJson`)
pub fn parse_stdio_message(line: &str) -> Result<StdioMessage, FramingError> {
    if line.len() > MAX_MESSAGE_BYTES {
        return Err(FramingError::MessageTooLarge {
            max_bytes: MAX_MESSAGE_BYTES,
        });
    }

    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(FramingError::MalformedJson {
            reason: "empty message".to_string(),
        });
    }

    let mut value: serde_json::Value =
        serde_json::from_str(trimmed).map_err(|e| FramingError::MalformedJson {
            reason: e.to_string(),
        })?;

    if value.is_array() {
        return Err(FramingError::UnsupportedBatch);
    }

    let kind = classify(&value, Origin::Local).map_err(|e| match e {
        ClassifyError::MissingVersion => FramingError::MissingVersion,
        ClassifyError::UnsupportedVersion(version) => FramingError::UnsupportedVersion { version },
        other @ (ClassifyError::InvalidId | ClassifyError::Unclassifiable) => {
            FramingError::MalformedJson {
                reason: other.to_string(),
            }
        }
    })?;

    // Take params out of the value instead of cloning.
    let params = value.as_object_mut().and_then(|obj| obj.remove("params"));

    Ok(StdioMessage { kind, params })
}

// ─────────────────────────────────────────────────────────────────────────────
// Bounded Line Reading
// ─────────────────────────────────────────────────────────────────────────────

/// Read a single line from an async buffered reader, enforcing a byte limit.
///
/// Raw bytes are accumulated so a multi-byte UTF-8 character straddling
/// internal buffer boundaries stays intact; the caller decodes the full
/// line.
///
/// # Returns
///
/// - `Ok(n)` where `n > 0`: a complete line (or the final unterminated
///   line) was read into `buf`
/// - `Ok(0)`: EOF reached
/// - `Err(FramingError::MessageTooLarge)`: line exceeded `max_bytes`; the
///   remainder of the line has been drained
/// - `Err(FramingError::Io)`: underlying I/O error
pub async fn bounded_read_line<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    max_bytes: usize,
) -> Result<usize, FramingError> {
    let mut total = 0usize;
    loop {
        let available = reader.fill_buf().await?;

        if available.is_empty() {
            return Ok(total);
        }

        match available.iter().position(|&b| b == b'\n') {
            Some(pos) => {
                let to_consume = pos + 1;
                if total + to_consume > max_bytes {
                    reader.consume(to_consume);
                    return Err(FramingError::MessageTooLarge { max_bytes });
                }

                buf.extend_from_slice(&available[..to_consume]);
                total += to_consume;
                reader.consume(to_consume);
                return Ok(total);
            }
            None => {
                let len = available.len();
                if total + len > max_bytes {
                    reader.consume(len);
                    drain_until_newline(reader).await;
                    return Err(FramingError::MessageTooLarge { max_bytes });
                }

                buf.extend_from_slice(available);
                total += len;
                reader.consume(len);
            }
        }
    }
}

/// Drain bytes from a reader until a newline or EOF is reached.
async fn drain_until_newline<R: AsyncBufRead + Unpin>(reader: &mut R) {
    loop {
        match reader.fill_buf().await {
            Ok([]) => return,
            Ok(buf) => {
                if let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                    reader.consume(pos + 1);
                    return;
                }
                let len = buf.len();
                reader.consume(len);
            }
            Err(e) => {
                tracing::warn!(error = %e, "IO error while draining oversized message");
                return;
            }
        }
    }
}
