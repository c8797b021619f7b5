//! Property-based tests for NDJSON parsing.
//!
//! Uses `proptest` to generate arbitrary JSON-RPC 2.0 messages and verify
//! that `parse_stdio_message` classifies them the same way the sender built
//! them, and that arbitrary non-JSON input is rejected without panicking.

use proptest::prelude::*;
use toolbridge::stdio::ndjson::parse_stdio_message;
use toolbridge_core::transport::MessageKind;

// ─────────────────────────────────────────────────────────────────────────────
// Strategies
// ─────────────────────────────────────────────────────────────────────────────

/// Generate a JSON-RPC 2.0 numeric or string id.
fn arb_jsonrpc_id() -> impl Strategy<Value = String> {
    prop_oneof![
        (1i64..=100_000).prop_map(|n| n.to_string()),
        "[a-zA-Z0-9_-]{1,32}".prop_map(|s| format!("\"{}\"", s)),
    ]
}

/// Generate a valid JSON-RPC method name (alphanumeric + slashes).
fn arb_method() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9_/]{0,30}"
}

// ─────────────────────────────────────────────────────────────────────────────
// Properties
// ─────────────────────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn requests_classify_as_requests(id in arb_jsonrpc_id(), method in arb_method()) {
        let line = format!(r#"{{"jsonrpc":"2.0","id":{id},"method":"{method}","params":{{}}}}"#);
        let parsed = parse_stdio_message(&line).unwrap();
        let parsed_method = match &parsed.kind {
            MessageKind::Request { method, .. } => Some(method.as_str()),
            _ => None,
        };
        prop_assert_eq!(parsed_method, Some(method.as_str()));
        prop_assert!(parsed.params.is_some());
    }

    #[test]
    fn notifications_classify_as_notifications(method in arb_method()) {
        let line = format!(r#"{{"jsonrpc":"2.0","method":"{method}"}}"#);
        let parsed = parse_stdio_message(&line).unwrap();
        let is_notification = matches!(parsed.kind, MessageKind::Notification { .. });
        prop_assert!(is_notification);
    }

    #[test]
    fn non_json_never_panics(line in "[^{\\[]{0,200}") {
        prop_assert!(parse_stdio_message(&line).is_err());
    }
}
