//! MCP method names used on either side of the bridge.

/// Protocol handshake (local side only).
pub const INITIALIZE: &str = "initialize";

/// Handshake completion notification (local side only).
pub const NOTIFICATION_INITIALIZED: &str = "notifications/initialized";

/// Cancellation notification. Logged and ignored: calls run to completion.
pub const NOTIFICATION_CANCELLED: &str = "notifications/cancelled";

/// Liveness probe (local side only).
pub const PING: &str = "ping";

/// Enumerate remote capabilities.
pub const TOOLS_LIST: &str = "tools/list";

/// Invoke a remote capability.
pub const TOOLS_CALL: &str = "tools/call";

/// Interim progress for an outstanding call.
pub const NOTIFICATION_PROGRESS: &str = "notifications/progress";

/// Returns true for methods the stdio server answers itself without
/// contacting the remote endpoint.
pub fn is_local_method(method: &str) -> bool {
    matches!(
        method,
        INITIALIZE | NOTIFICATION_INITIALIZED | NOTIFICATION_CANCELLED | PING
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_methods() {
        assert!(is_local_method("initialize"));
        assert!(is_local_method("ping"));
        assert!(is_local_method("notifications/initialized"));
        assert!(!is_local_method("tools/call"));
        assert!(!is_local_method("tools/list"));
        assert!(!is_local_method("resources/list"));
    }
}
