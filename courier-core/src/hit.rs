//! The persisted unit of work ("hit") and its queue envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{CourierResult, PayloadError};
use crate::event::Event;

/// Config/identity snapshot captured by the host when an event is accepted.
///
/// Captured at accept time so a queued hit still sends with the context it
/// was created under, even if the host configuration changes afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// Datastream/configuration id for the request URL. May be empty when
    /// the host had no configuration; the assembler rejects it then.
    pub config_id: String,
    /// Identity map object placed at the top of the request's XDM payload.
    pub identity_map: Option<Value>,
}

impl RequestContext {
    pub fn new(config_id: impl Into<String>) -> Self {
        Self {
            config_id: config_id.into(),
            identity_map: None,
        }
    }

    pub fn with_identity_map(mut self, identity_map: Value) -> Self {
        self.identity_map = Some(identity_map);
        self
    }
}

/// One queued request, tagged by kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Hit {
    /// A batch of experience events sent to the interact endpoint.
    Experience {
        events: Vec<Event>,
        context: RequestContext,
    },
    /// A consent-preferences update sent to the consent endpoint.
    Consent {
        event: Event,
        context: RequestContext,
    },
    /// Identity-reset cleanup; clears the store cache, nothing is sent.
    ResetIdentities,
}

/// The record the durable queue persists and hands back to the processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Unique id; the primary event's id for event hits.
    pub id: String,
    /// Creation time of the underlying event.
    pub timestamp: DateTime<Utc>,
    /// Serialized `Hit` envelope.
    pub payload: Vec<u8>,
}

impl QueueEntry {
    /// Serialize a hit into a queue entry.
    pub fn new(id: impl Into<String>, timestamp: DateTime<Utc>, hit: &Hit) -> CourierResult<Self> {
        let payload = serde_json::to_vec(hit)
            .map_err(|e| PayloadError::Serialization(e.to_string()))?;
        Ok(Self {
            id: id.into(),
            timestamp,
            payload,
        })
    }

    /// Decode the hit envelope. A failure marks the entry as poison.
    pub fn hit(&self) -> CourierResult<Hit> {
        serde_json::from_slice(&self.payload)
            .map_err(|e| PayloadError::Serialization(e.to_string()).into())
    }
}
