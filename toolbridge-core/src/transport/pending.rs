//! Outstanding-call bookkeeping.
//!
//! Every outbound envelope is registered here under its correlation ID for
//! exactly as long as its exchange runs. The map holds metadata only: the
//! terminal response travels back to the caller as the return value of the
//! exchange that owns the slot, and the event-stream reassembler matches it
//! by correlation ID on its own. What the map answers is whether a progress
//! token belongs to a live call, and how many calls are in flight.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tracing::debug;

use crate::protocol::ProgressToken;

/// Metadata for an outstanding outbound call.
#[derive(Debug, Clone)]
pub struct PendingCall {
    /// Remote method
    pub method: String,
    /// Progress token attached to the call, if any
    pub progress_token: Option<ProgressToken>,
    /// When the envelope was issued
    pub started_at: Instant,
}

/// Map from correlation ID to pending-call metadata.
///
/// Cloning shares the same map.
#[derive(Debug, Clone, Default)]
pub struct PendingCalls {
    inner: Arc<Mutex<HashMap<i64, PendingCall>>>,
}

impl PendingCalls {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<i64, PendingCall>> {
        // A panic while holding the lock cannot leave the map half-written
        // (every critical section is a single insert/remove/lookup).
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record an outstanding call. The slot is released when the returned
    /// guard drops.
    pub fn register(
        &self,
        correlation_id: i64,
        method: &str,
        progress_token: Option<ProgressToken>,
    ) -> PendingGuard {
        self.lock().insert(
            correlation_id,
            PendingCall {
                method: method.to_string(),
                progress_token,
                started_at: Instant::now(),
            },
        );
        PendingGuard {
            calls: self.clone(),
            correlation_id,
        }
    }

    /// Whether some outstanding call owns `token`.
    pub fn owns_token(&self, token: &ProgressToken) -> bool {
        self.lock()
            .values()
            .any(|call| call.progress_token.as_ref() == Some(token))
    }

    /// Number of outstanding calls.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no call is outstanding.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Releases a pending slot on drop, on success and failure paths alike.
#[derive(Debug)]
pub struct PendingGuard {
    calls: PendingCalls,
    correlation_id: i64,
}

impl PendingGuard {
    /// The correlation ID this guard holds.
    pub fn correlation_id(&self) -> i64 {
        self.correlation_id
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if let Some(call) = self.calls.lock().remove(&self.correlation_id) {
            debug!(
                correlation_id = self.correlation_id,
                method = %call.method,
                elapsed_ms = call.started_at.elapsed().as_millis() as u64,
                "Outbound call finished"
            );
        }
    }
}
