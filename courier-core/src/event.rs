//! The host event envelope and its well-known payload keys.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

// Well-known keys the pipeline inspects on incoming event payloads.
const KEY_XDM: &str = "xdm";
const KEY_DATA: &str = "data";
const KEY_DATASET_ID: &str = "datasetId";
const KEY_CONSENTS: &str = "consents";
const KEY_CONFIG: &str = "config";
const KEY_DATASTREAM_ID_OVERRIDE: &str = "datastreamIdOverride";
const KEY_DATASTREAM_CONFIG_OVERRIDE: &str = "datastreamConfigOverride";
const KEY_REQUEST: &str = "request";
const KEY_REQUEST_PATH: &str = "path";

/// One application event handed to the pipeline by the host event bus.
///
/// The payload is an opaque JSON object; the pipeline only inspects the
/// well-known keys exposed through the accessors below.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event id; also the id server responses are matched back to.
    pub id: Uuid,
    /// Creation time, stamped into the outbound payload when absent.
    pub timestamp: DateTime<Utc>,
    /// Opaque payload map.
    pub data: Map<String, Value>,
}

impl Event {
    /// Create an event with a fresh id and the current time.
    pub fn new(data: Map<String, Value>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            data,
        }
    }

    /// The event's XDM object, if present.
    pub fn xdm(&self) -> Option<&Map<String, Value>> {
        self.data.get(KEY_XDM).and_then(Value::as_object)
    }

    /// The event's free-form data object, if present.
    pub fn free_form_data(&self) -> Option<&Map<String, Value>> {
        self.data.get(KEY_DATA).and_then(Value::as_object)
    }

    /// The collect dataset id, trimmed; `None` when absent or blank.
    pub fn dataset_id(&self) -> Option<&str> {
        self.data
            .get(KEY_DATASET_ID)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// The consents object carried by a consent-update event.
    pub fn consents(&self) -> Option<&Value> {
        self.data.get(KEY_CONSENTS)
    }

    /// A datastream id override from the event's config block.
    pub fn datastream_id_override(&self) -> Option<&str> {
        self.config_block()?
            .get(KEY_DATASTREAM_ID_OVERRIDE)
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
    }

    /// A datastream config override object from the event's config block.
    pub fn datastream_config_override(&self) -> Option<&Map<String, Value>> {
        self.config_block()?
            .get(KEY_DATASTREAM_CONFIG_OVERRIDE)
            .and_then(Value::as_object)
    }

    /// A custom request path from the event's request block.
    pub fn request_path(&self) -> Option<&str> {
        self.data
            .get(KEY_REQUEST)
            .and_then(Value::as_object)?
            .get(KEY_REQUEST_PATH)
            .and_then(Value::as_str)
    }

    /// The timestamp formatted the way the wire contract wants it:
    /// ISO-8601 UTC with millisecond precision.
    pub fn wire_timestamp(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    fn config_block(&self) -> Option<&Map<String, Value>> {
        self.data.get(KEY_CONFIG).and_then(Value::as_object)
    }
}
