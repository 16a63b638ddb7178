//! Request assembly: from queued hits to ready-to-send wire requests.
//!
//! Assembly happens per send attempt, so every retry picks up the current
//! store entries and location hint.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use uuid::Uuid;

use courier_core::config::NetworkConfig;
use courier_core::errors::{CourierResult, PayloadError};
use courier_core::{Event, RequestContext};
use courier_net::protocol::request::{
    ConsentQuery, ConsentRequest, DatastreamMeta, InteractRequest, KonductorConfig, RequestMeta,
    RequestXdm, SdkConfigMeta, StateMeta,
};
use courier_net::protocol::response::StorePayloadEntry;
use courier_net::{build_url, validate_custom_path, EdgeRequest, RequestOperation, StreamFraming};
use courier_store::{LocationHintCache, StoreCache};

/// A wire request and the fresh batch id it was built under.
pub struct AssembledRequest {
    pub batch_id: String,
    pub request: EdgeRequest,
}

pub struct RequestAssembler {
    network: NetworkConfig,
    store: Arc<StoreCache>,
    location_hint: Arc<LocationHintCache>,
}

impl RequestAssembler {
    pub fn new(
        network: NetworkConfig,
        store: Arc<StoreCache>,
        location_hint: Arc<LocationHintCache>,
    ) -> Self {
        Self {
            network,
            store,
            location_hint,
        }
    }

    /// Build the interact request for a batch of experience events.
    ///
    /// The first event governs batch-level choices: datastream override,
    /// config overrides, and a custom request path.
    pub fn build_experience(
        &self,
        events: &[Event],
        context: &RequestContext,
    ) -> CourierResult<AssembledRequest> {
        let first = events.first().ok_or(PayloadError::EmptyBatch)?;

        let (config_id, sdk_config) = match first.datastream_id_override() {
            Some(override_id) => (
                override_id.to_string(),
                Some(SdkConfigMeta {
                    datastream: DatastreamMeta {
                        original: context.config_id.clone(),
                    },
                }),
            ),
            None => (context.config_id.clone(), None),
        };
        if config_id.trim().is_empty() {
            return Err(PayloadError::MissingConfigId.into());
        }

        let operation = match first.request_path() {
            Some(path) => {
                validate_custom_path(path)?;
                RequestOperation::Custom(path.to_string())
            }
            None => RequestOperation::Interact,
        };

        let body = InteractRequest {
            xdm: RequestXdm::new(context.identity_map.clone()),
            events: events.iter().map(event_payload).collect(),
            meta: RequestMeta {
                konductor_config: KonductorConfig::from_config(&self.network.streaming),
                state: self.state_meta()?,
                sdk_config,
                config_overrides: first
                    .datastream_config_override()
                    .map(|m| Value::Object(m.clone())),
            },
        };
        self.assemble(operation, &config_id, body)
    }

    /// Build the consent request. Consent updates always use the standard
    /// endpoint and the context's own configuration id.
    pub fn build_consent(
        &self,
        event: &Event,
        context: &RequestContext,
    ) -> CourierResult<AssembledRequest> {
        let consents = event.consents().ok_or(PayloadError::MissingConsents)?;
        if context.config_id.trim().is_empty() {
            return Err(PayloadError::MissingConfigId.into());
        }

        let body = ConsentRequest {
            query: ConsentQuery::update(),
            identity_map: context.identity_map.clone(),
            consent: vec![consents.clone()],
            meta: RequestMeta {
                konductor_config: KonductorConfig::from_config(&self.network.streaming),
                ..RequestMeta::default()
            },
        };
        self.assemble(RequestOperation::Consent, &context.config_id, body)
    }

    fn state_meta(&self) -> CourierResult<Option<StateMeta>> {
        let entries = self.store.all_active()?;
        if entries.is_empty() {
            return Ok(None);
        }
        Ok(Some(StateMeta {
            entries: entries
                .into_iter()
                .map(|e| StorePayloadEntry {
                    key: e.key,
                    value: e.value,
                    max_age: e.max_age,
                })
                .collect(),
        }))
    }

    fn assemble<B: serde::Serialize>(
        &self,
        operation: RequestOperation,
        config_id: &str,
        body: B,
    ) -> CourierResult<AssembledRequest> {
        let batch_id = Uuid::new_v4().to_string();
        let hint = self.location_hint.get()?;
        let url = build_url(
            &self.network,
            &operation,
            hint.as_deref(),
            config_id,
            &batch_id,
        );
        let body =
            serde_json::to_value(body).map_err(|e| PayloadError::Serialization(e.to_string()))?;

        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Accept".to_string(), "application/json".to_string());

        let streaming = self
            .network
            .streaming
            .enabled
            .then(|| StreamFraming::from(&self.network.streaming));

        Ok(AssembledRequest {
            batch_id,
            request: EdgeRequest {
                url,
                body,
                headers,
                streaming,
            },
        })
    }
}

/// One event as it appears in the request's `events` array.
fn event_payload(event: &Event) -> Value {
    let mut xdm = event.xdm().cloned().unwrap_or_default();
    xdm.insert("_id".to_string(), Value::String(event.id.to_string()));
    xdm.entry("timestamp")
        .or_insert_with(|| Value::String(event.wire_timestamp()));

    let mut payload = Map::new();
    payload.insert("xdm".to_string(), Value::Object(xdm));
    if let Some(data) = event.free_form_data() {
        payload.insert("data".to_string(), Value::Object(data.clone()));
    }
    if let Some(dataset_id) = event.dataset_id() {
        payload.insert(
            "meta".to_string(),
            serde_json::json!({ "collect": { "datasetId": dataset_id } }),
        );
    }
    Value::Object(payload)
}
