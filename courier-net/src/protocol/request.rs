//! Outbound request bodies for the Edge collection endpoints.
//!
//! Field names follow the server contract, hence the camelCase renames.

use serde::Serialize;
use serde_json::Value;

use courier_core::config::StreamingConfig;

use super::response::StorePayloadEntry;

/// Identifier reported under `xdm.implementationDetails.name`.
pub const IMPLEMENTATION_NAME: &str = "https://ns.courier.dev/rust";

/// Environment reported under `xdm.implementationDetails.environment`.
pub const IMPLEMENTATION_ENVIRONMENT: &str = "app";

/// Consent operation for `/v1/privacy/set-consent`.
pub const CONSENT_OPERATION_UPDATE: &str = "update";

/// `xdm.implementationDetails` identifying this client build.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImplementationDetails {
    pub name: &'static str,
    pub version: &'static str,
    pub environment: &'static str,
}

impl Default for ImplementationDetails {
    fn default() -> Self {
        Self {
            name: IMPLEMENTATION_NAME,
            version: env!("CARGO_PKG_VERSION"),
            environment: IMPLEMENTATION_ENVIRONMENT,
        }
    }
}

/// Request-level XDM block shared by every event in the batch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestXdm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_map: Option<Value>,
    pub implementation_details: ImplementationDetails,
}

impl RequestXdm {
    pub fn new(identity_map: Option<Value>) -> Self {
        Self {
            identity_map,
            implementation_details: ImplementationDetails::default(),
        }
    }
}

/// Streamed-response negotiation advertised to the server.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingMeta {
    pub enabled: bool,
    pub record_separator: String,
    pub line_feed: String,
}

/// `meta.konductorConfig`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KonductorConfig {
    pub streaming: StreamingMeta,
}

impl KonductorConfig {
    /// Streaming advertisement, `None` when streaming is disabled.
    pub fn from_config(streaming: &StreamingConfig) -> Option<Self> {
        if !streaming.enabled {
            return None;
        }
        Some(Self {
            streaming: StreamingMeta {
                enabled: true,
                record_separator: streaming.record_separator.clone(),
                line_feed: streaming.line_feed.clone(),
            },
        })
    }
}

/// `meta.state` — cached store entries echoed back to the server.
#[derive(Debug, Clone, Serialize)]
pub struct StateMeta {
    pub entries: Vec<StorePayloadEntry>,
}

/// `meta.sdkConfig` — records the original datastream id when an event
/// overrides it.
#[derive(Debug, Clone, Serialize)]
pub struct SdkConfigMeta {
    pub datastream: DatastreamMeta,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatastreamMeta {
    pub original: String,
}

/// The `meta` block of a request.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub konductor_config: Option<KonductorConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<StateMeta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sdk_config: Option<SdkConfigMeta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_overrides: Option<Value>,
}

/// Body for `/v1/interact` — a batch of experience events.
#[derive(Debug, Clone, Serialize)]
pub struct InteractRequest {
    pub xdm: RequestXdm,
    pub events: Vec<Value>,
    pub meta: RequestMeta,
}

/// Body for `/v1/privacy/set-consent`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentRequest {
    pub query: ConsentQuery,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_map: Option<Value>,
    pub consent: Vec<Value>,
    pub meta: RequestMeta,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsentQuery {
    pub consent: ConsentOperation,
}

impl ConsentQuery {
    pub fn update() -> Self {
        Self {
            consent: ConsentOperation {
                operation: CONSENT_OPERATION_UPDATE.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsentOperation {
    pub operation: String,
}
