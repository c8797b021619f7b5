//! Remote MCP client.
//!
//! Sends one [`OutboundEnvelope`] per call to the configured endpoint and
//! turns whatever comes back into an [`InboundEnvelope`]. The remote may
//! answer with a single JSON document or with an event stream; both are
//! handled here, the latter through [`sse::reassemble`].
//!
//! # Error Classification
//!
//! [`UpstreamClient::forward`] never returns an error. Every failure is
//! converted into a JSON-RPC error envelope carrying the request's ID:
//! - Timeout → `UpstreamTimeout` (-32001)
//! - Connection errors → `UpstreamConnectionFailed` (-32000)
//! - Non-2xx status → `UpstreamHttpStatus` (-32002), first 200 bytes of body
//! - Oversized document → `ResponseTooLarge` (-32003)
//! - Undecodable document → `MalformedResponse` (-32004)
//!
//! # Security
//!
//! - TLS certificate verification is enabled (rustls)
//! - The API key header is marked sensitive and never logged
//! - No automatic retry (tool calls may have side effects)

use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::{Stream, TryStreamExt};
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use tracing::{debug, error, warn};

use crate::config::{BridgeConfig, ConfigError};
use crate::error::BridgeError;
use crate::relay::ProgressRelay;
use crate::transport::jsonrpc::{InboundEnvelope, JsonRpcId, JsonRpcResponse, OutboundEnvelope};
use crate::transport::sse;

/// Media types the bridge accepts from the remote.
const ACCEPT_MEDIA_TYPES: &str = "application/json, text/event-stream";

/// Media type that selects the stream path.
const EVENT_STREAM: &str = "text/event-stream";

/// Boxed byte stream of an event-stream response body.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, BridgeError>> + Send>>;

/// A successful HTTP response body, tagged by how it must be consumed.
pub enum UpstreamBody {
    /// A single JSON document, fully buffered under the size cap.
    Document(Bytes),
    /// An event stream, consumed incrementally.
    EventStream(ByteStream),
}

/// Remote MCP client.
///
/// `Clone` and cheap to share across tasks; reqwest pools connections
/// internally.
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client,
    config: Arc<BridgeConfig>,
    auth_header: HeaderValue,
}

impl UpstreamClient {
    /// Create a new client for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidApiKey`] if the key cannot be sent as
    /// a header value, [`ConfigError::HttpClient`] if the HTTP client cannot
    /// be built.
    pub fn new(config: BridgeConfig) -> Result<Self, ConfigError> {
        let mut auth_header = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|_| ConfigError::InvalidApiKey)?;
        auth_header.set_sensitive(true);

        // The total deadline is enforced around the whole exchange in
        // `forward`, so the client only bounds connection setup.
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| ConfigError::HttpClient {
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            config: Arc::new(config),
            auth_header,
        })
    }

    /// The configuration this client was built from.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Forward one envelope and return the remote's answer.
    ///
    /// The whole exchange, including draining an event stream, is bounded
    /// by the configured timeout. Failures come back as error envelopes
    /// whose `id` is the envelope's correlation ID.
    #[tracing::instrument(skip(self, envelope, relay), fields(method = %envelope.method, correlation_id = envelope.correlation_id))]
    pub async fn forward(
        &self,
        envelope: &OutboundEnvelope,
        relay: &ProgressRelay,
    ) -> InboundEnvelope {
        let outcome =
            match tokio::time::timeout(self.config.timeout, self.exchange(envelope, relay)).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(
                        timeout_secs = self.config.timeout.as_secs(),
                        "Upstream exchange timed out"
                    );
                    Err(self.timeout_error())
                }
            };

        match outcome {
            Ok(inbound) => inbound,
            Err(e) => {
                warn!(
                    correlation_id = envelope.correlation_id,
                    error = %e,
                    error_type = e.error_type_name(),
                    "Upstream exchange failed"
                );
                JsonRpcResponse::error(Some(envelope.id()), e.to_jsonrpc_error())
            }
        }
    }

    async fn exchange(
        &self,
        envelope: &OutboundEnvelope,
        relay: &ProgressRelay,
    ) -> Result<InboundEnvelope, BridgeError> {
        let correlation_id = envelope.correlation_id;
        match self.send(envelope).await? {
            UpstreamBody::Document(bytes) => parse_document(&bytes, correlation_id),
            UpstreamBody::EventStream(stream) => {
                sse::reassemble(stream, correlation_id, self.config.max_response_bytes, relay)
                    .await
            }
        }
    }

    /// POST the envelope and classify the response body.
    async fn send(&self, envelope: &OutboundEnvelope) -> Result<UpstreamBody, BridgeError> {
        let correlation_id = envelope.correlation_id;

        debug!(
            correlation_id,
            method = %envelope.method,
            url = %self.config.server_url,
            "Forwarding request to upstream"
        );

        let response = self
            .client
            .post(self.config.server_url.as_url().clone())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, ACCEPT_MEDIA_TYPES)
            .header(AUTHORIZATION, self.auth_header.clone())
            .json(envelope)
            .send()
            .await
            .map_err(|e| self.classify_error(e, correlation_id))?;

        let status = response.status();
        if !status.is_success() {
            let body_prefix = read_error_prefix(response, self.config.max_error_body_bytes).await;
            warn!(correlation_id, status = status.as_u16(), "Upstream returned error status");
            return Err(BridgeError::UpstreamHttpStatus {
                status: status.as_u16(),
                body_prefix,
            });
        }

        if is_event_stream(&response) {
            if response.content_length() == Some(0) {
                return Err(BridgeError::NoResponseBody);
            }
            debug!(correlation_id, "Upstream answered with an event stream");
            let this = self.clone();
            let stream = response
                .bytes_stream()
                .map_err(move |e| this.classify_error(e, correlation_id));
            return Ok(UpstreamBody::EventStream(Box::pin(stream)));
        }

        let bytes = self.read_body_limited(response, correlation_id).await?;
        Ok(UpstreamBody::Document(bytes))
    }

    /// Read the response body with a size limit.
    ///
    /// Checks the `Content-Length` header first (if present) for early
    /// rejection, then reads chunk by chunk so chunked responses cannot
    /// grow past the cap either. A body of exactly the cap is accepted.
    async fn read_body_limited(
        &self,
        mut response: reqwest::Response,
        correlation_id: i64,
    ) -> Result<Bytes, BridgeError> {
        let max_size = self.config.max_response_bytes;

        if let Some(content_length) = response.content_length() {
            if content_length > max_size as u64 {
                warn!(
                    correlation_id,
                    content_length,
                    max_response_bytes = max_size,
                    "Upstream response exceeds size limit (Content-Length)"
                );
                return Err(BridgeError::ResponseTooLarge {
                    max_bytes: max_size,
                });
            }
        }

        let mut buf = Vec::with_capacity(
            response
                .content_length()
                .map(|cl| cl as usize)
                .unwrap_or(8192)
                .min(max_size),
        );

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| self.classify_error(e, correlation_id))?
        {
            if buf.len() + chunk.len() > max_size {
                warn!(
                    correlation_id,
                    accumulated = buf.len(),
                    chunk_size = chunk.len(),
                    max_response_bytes = max_size,
                    "Upstream response exceeds size limit during streaming"
                );
                return Err(BridgeError::ResponseTooLarge {
                    max_bytes: max_size,
                });
            }
            buf.extend_from_slice(&chunk);
        }

        Ok(buf.into())
    }

    fn timeout_error(&self) -> BridgeError {
        BridgeError::UpstreamTimeout {
            url: self.config.server_url.to_string(),
            timeout_secs: self.config.timeout.as_secs(),
        }
    }

    /// Classify a reqwest error into a [`BridgeError`].
    fn classify_error(&self, error: reqwest::Error, correlation_id: i64) -> BridgeError {
        if error.is_timeout() {
            warn!(
                correlation_id,
                timeout_secs = self.config.timeout.as_secs(),
                "Upstream request timed out"
            );
            self.timeout_error()
        } else if error.is_connect() {
            warn!(
                correlation_id,
                url = %self.config.server_url,
                "Failed to connect to upstream"
            );
            BridgeError::UpstreamConnectionFailed {
                url: self.config.server_url.to_string(),
                reason: error.to_string(),
            }
        } else {
            error!(correlation_id, error = %error, "Upstream request failed");
            BridgeError::UpstreamConnectionFailed {
                url: self.config.server_url.to_string(),
                reason: error.to_string(),
            }
        }
    }
}

fn is_event_stream(response: &reqwest::Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|media| media.trim().eq_ignore_ascii_case(EVENT_STREAM))
}

/// Read at most `max_bytes` of an error body, lossily decoded.
async fn read_error_prefix(mut response: reqwest::Response, max_bytes: usize) -> String {
    let mut buf = Vec::with_capacity(max_bytes);
    while buf.len() < max_bytes {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                let take = (max_bytes - buf.len()).min(chunk.len());
                buf.extend_from_slice(&chunk[..take]);
            }
            Ok(None) => break,
            Err(e) => {
                debug!(error = %e, "Failed to read upstream error body");
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).trim().to_string()
}

/// Decode a single-document response for the call with `correlation_id`.
///
/// The document must answer that call. An error response with a null or
/// absent `id` is also accepted: the remote could not read our ID.
fn parse_document(bytes: &[u8], correlation_id: i64) -> Result<InboundEnvelope, BridgeError> {
    let envelope: InboundEnvelope =
        serde_json::from_slice(bytes).map_err(|e| BridgeError::MalformedResponse {
            details: e.to_string(),
        })?;

    if envelope.answers(correlation_id) {
        return Ok(envelope);
    }
    if envelope.error.is_some() && matches!(envelope.id, None | Some(JsonRpcId::Null)) {
        return Ok(envelope);
    }

    warn!(
        correlation_id,
        stray_id = ?envelope.id,
        "Upstream document answers a different request"
    );
    Err(BridgeError::NoTerminalResult { correlation_id })
}

/// Trait for the remote client (enables mocking in tests).
#[async_trait::async_trait]
pub trait UpstreamForwarder: Send + Sync {
    /// Forward one envelope; never fails (see [`UpstreamClient::forward`]).
    async fn forward(&self, envelope: &OutboundEnvelope, relay: &ProgressRelay)
    -> InboundEnvelope;
}

#[async_trait::async_trait]
impl UpstreamForwarder for UpstreamClient {
    async fn forward(
        &self,
        envelope: &OutboundEnvelope,
        relay: &ProgressRelay,
    ) -> InboundEnvelope {
        UpstreamClient::forward(self, envelope, relay).await
    }
}
