//! Broker topics and key names shared with the cloud platform.

use core::fmt::Write;

pub const TELEMETRY_TOPIC: &str = "v1/devices/me/telemetry";
pub const ATTRIBUTES_TOPIC: &str = "v1/devices/me/attributes";
pub const RPC_REQUEST_TOPIC: &str = "v1/devices/me/rpc/request/+";
pub const RPC_RESPONSE_TOPIC: &str = "v1/devices/me/rpc/response/";

/// Substring that marks an inbound RPC request topic.
pub const RPC_REQUEST_MARKER: &str = "rpc/request/";

/// Longest topic the firmware ever builds or accepts.
pub const MAX_TOPIC_LEN: usize = 128;

pub type Topic = heapless::String<MAX_TOPIC_LEN>;

pub fn is_rpc_request(topic: &str) -> bool {
    topic.contains(RPC_REQUEST_MARKER)
}

pub fn is_attributes(topic: &str) -> bool {
    topic == ATTRIBUTES_TOPIC
}

/// Parse the numeric request id from the trailing path segment,
/// e.g. `v1/devices/me/rpc/request/42` → `Some(42)`.
pub fn request_id(topic: &str) -> Option<u32> {
    let (_, last) = topic.rsplit_once('/')?;
    if last.is_empty() || !last.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    last.parse().ok()
}

/// `RPC_RESPONSE_TOPIC` followed by `id`.
pub fn response_topic(id: u32) -> Topic {
    let mut topic = Topic::new();
    // Prefix (28 bytes) + at most 10 digits always fits.
    let _ = write!(topic, "{RPC_RESPONSE_TOPIC}{id}");
    topic
}
