//! Progress relay.
//!
//! Forwards remote `notifications/progress` events to the local caller while
//! the owning call is still outstanding. Delivery is best-effort: a lost
//! progress update never fails the call it belongs to.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::protocol::ProgressEvent;
use crate::transport::pending::PendingCalls;

/// Failure to deliver a notification to the local caller.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The local channel is gone (e.g. stdout closed).
    #[error("local channel closed")]
    Closed,

    /// Writing the notification failed.
    #[error("failed to write notification: {0}")]
    Write(String),
}

/// The local side's notification channel.
///
/// Implemented by the stdio server; the core only ever pushes into it.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Push one complete JSON-RPC notification to the local caller.
    async fn send_notification(&self, notification: Value) -> Result<(), SinkError>;
}

/// Relays progress events for live calls to a [`NotificationSink`].
#[derive(Clone)]
pub struct ProgressRelay {
    sink: Arc<dyn NotificationSink>,
    pending: PendingCalls,
}

impl ProgressRelay {
    /// Create a relay bound to `sink`, filtering by the calls in `pending`.
    pub fn new(sink: Arc<dyn NotificationSink>, pending: PendingCalls) -> Self {
        Self { sink, pending }
    }

    /// Forward `event` to the local caller.
    ///
    /// Returns `true` if the notification was written. Events whose token
    /// belongs to no outstanding call are dropped, and sink failures are
    /// logged and swallowed.
    pub async fn relay(&self, event: ProgressEvent) -> bool {
        if !self.pending.owns_token(&event.progress_token) {
            debug!(
                progress_token = %event.progress_token,
                "Dropping progress for unknown or finished call"
            );
            return false;
        }

        let token = event.progress_token.clone();
        match self.sink.send_notification(event.to_notification()).await {
            Ok(()) => true,
            Err(e) => {
                warn!(progress_token = %token, error = %e, "Failed to relay progress");
                false
            }
        }
    }
}
