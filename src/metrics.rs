//! Metric helpers for `gattframe`.
//!
//! This module defines metric names and simple helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. Without the `metrics` feature
//! the helpers compile to no-ops.

#[cfg(feature = "metrics")]
use metrics::counter;

/// Name of the counter tracking notifications fed into a router.
pub const FRAGMENTS_RECEIVED: &str = "gattframe_fragments_received_total";
/// Name of the counter tracking responses reassembled and decoded.
pub const MESSAGES_DECODED: &str = "gattframe_messages_decoded_total";
/// Name of the counter tracking reassembly, decode and hand-off failures.
pub const ERRORS_TOTAL: &str = "gattframe_errors_total";
/// Name of the counter tracking partial responses evicted after a timeout.
pub const REASSEMBLIES_EVICTED: &str = "gattframe_reassemblies_evicted_total";

/// Stage at which a response was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The fragment stream broke the framing rules.
    Reassembly,
    /// The reassembled payload was not valid TLV.
    Decode,
    /// The fragment arrived on a channel nobody registered.
    UnknownChannel,
    /// The response queue was full and the outcome was dropped.
    QueueFull,
}

impl ErrorKind {
    #[cfg_attr(not(feature = "metrics"), expect(dead_code, reason = "used only for metric labels"))]
    fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Reassembly => "reassembly",
            ErrorKind::Decode => "decode",
            ErrorKind::UnknownChannel => "unknown_channel",
            ErrorKind::QueueFull => "queue_full",
        }
    }
}

/// Record a received notification.
pub fn inc_fragments() {
    #[cfg(feature = "metrics")]
    counter!(FRAGMENTS_RECEIVED).increment(1);
}

/// Record a decoded response, labelled by whether the peer reported success.
pub fn inc_messages(success: bool) {
    #[cfg(feature = "metrics")]
    counter!(MESSAGES_DECODED, "success" => if success { "true" } else { "false" }).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = success;
}

/// Record a failure at the given stage.
pub fn inc_errors(kind: ErrorKind) {
    #[cfg(feature = "metrics")]
    counter!(ERRORS_TOTAL, "kind" => kind.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = kind;
}

/// Record `count` evicted partial responses.
pub fn inc_evictions(count: u64) {
    #[cfg(feature = "metrics")]
    counter!(REASSEMBLIES_EVICTED).increment(count);
    #[cfg(not(feature = "metrics"))]
    let _ = count;
}
