//! Property-based tests for event-stream reassembly.
//!
//! The reassembled outcome must not depend on where the transport happens
//! to split the byte stream.

use proptest::prelude::*;
use serde_json::json;
use toolbridge_core::transport::StreamReassembler;

const LIMIT: usize = 1024 * 1024;

/// A stream carrying progress, a stray reply, non-ASCII text, and the
/// terminal reply for request 7.
fn sample_stream() -> Vec<u8> {
    let lines = [
        ": comment\n".to_string(),
        "event: message\r\n".to_string(),
        format!(
            "data: {}\n\n",
            json!({"jsonrpc": "2.0", "method": "notifications/progress",
                   "params": {"progressToken": "t", "progress": 1, "total": 3}})
        ),
        format!("data: {}\n\n", json!({"jsonrpc": "2.0", "id": 6, "result": "stray"})),
        format!(
            "data: {}\n\n",
            json!({"jsonrpc": "2.0", "method": "notifications/progress",
                   "params": {"progressToken": "t", "progress": 2, "message": "h\u{e9}llo \u{1f600}"}})
        ),
        format!(
            "data: {}\n\n",
            json!({"jsonrpc": "2.0", "id": 7, "result": {"content": [{"type": "text", "text": "\u{4f60}\u{597d}"}]}})
        ),
    ];
    lines.concat().into_bytes()
}

fn run(stream: &[u8], cuts: &[usize]) -> (Vec<f64>, serde_json::Value) {
    let mut reassembler = StreamReassembler::new(7, LIMIT);
    let mut progress = Vec::new();
    let mut start = 0;
    for &cut in cuts {
        progress.extend(reassembler.feed(&stream[start..cut]).into_iter().map(|e| e.progress));
        start = cut;
    }
    progress.extend(reassembler.feed(&stream[start..]).into_iter().map(|e| e.progress));
    progress.extend(reassembler.finish().into_iter().map(|e| e.progress));
    let envelope = reassembler.into_result().unwrap();
    (progress, envelope.result.unwrap())
}

proptest! {
    #[test]
    fn chunking_does_not_change_outcome(points in prop::collection::vec(any::<prop::sample::Index>(), 0..40)) {
        let stream = sample_stream();
        let mut cuts: Vec<usize> = points.iter().map(|i| i.index(stream.len() + 1)).collect();
        cuts.sort_unstable();

        let (progress, result) = run(&stream, &cuts);
        prop_assert_eq!(progress, vec![1.0, 2.0]);
        prop_assert_eq!(result, json!({"content": [{"type": "text", "text": "\u{4f60}\u{597d}"}]}));
    }
}

#[test]
fn byte_at_a_time_matches_whole() {
    let stream = sample_stream();
    let cuts: Vec<usize> = (1..stream.len()).collect();
    assert_eq!(run(&stream, &cuts), run(&stream, &[]));
}
