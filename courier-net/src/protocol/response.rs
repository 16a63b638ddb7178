//! Inbound response shapes: handles, errors, and warnings.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Handle type carrying store payload entries.
pub const HANDLE_TYPE_STATE_STORE: &str = "state:store";

/// Handle type carrying location hints.
pub const HANDLE_TYPE_LOCATION_HINT: &str = "locationHint:result";

/// The location hint scope that affects request routing.
pub const LOCATION_HINT_SCOPE_EDGE: &str = "EdgeNetwork";

/// One response chunk — a complete non-streamed body or one streamed record.
///
/// Every block is optional on the wire; absent blocks read as empty.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseChunk {
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub handle: Vec<Handle>,
    #[serde(default)]
    pub errors: Vec<Value>,
    #[serde(default)]
    pub warnings: Vec<Value>,
}

/// One server handle with its positional attribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Handle {
    #[serde(rename = "type")]
    pub handle_type: String,
    #[serde(default)]
    pub payload: Vec<Value>,
    #[serde(
        rename = "eventIndex",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub event_index: Option<usize>,
}

impl Handle {
    /// Index of the originating event in the batch; absent means the first.
    pub fn index(&self) -> usize {
        self.event_index.unwrap_or(0)
    }
}

/// `state:store` payload item. Also echoed back under `meta.state.entries`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorePayloadEntry {
    pub key: String,
    pub value: String,
    pub max_age: i64,
}

/// `locationHint:result` payload item.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationHintPayload {
    pub scope: String,
    pub hint: String,
    pub ttl_seconds: i64,
}

/// Resolve the event index an error or warning object points at.
///
/// Servers report it either at the top level or under `report.eventIndex`;
/// absent means the first event.
pub fn error_event_index(error: &Value) -> usize {
    error
        .get("eventIndex")
        .and_then(Value::as_u64)
        .or_else(|| error.pointer("/report/eventIndex").and_then(Value::as_u64))
        .map(|i| i as usize)
        .unwrap_or(0)
}

/// Fallback error body for a non-2xx response with no parseable JSON.
pub fn generic_error_body(status: u16, raw: &str) -> Value {
    serde_json::json!({
        "status": status,
        "title": "Unexpected response",
        "detail": raw,
    })
}
