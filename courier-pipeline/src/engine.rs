//! The embedding host's entry point to the delivery pipeline.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use courier_core::config::CourierConfig;
use courier_core::errors::{CourierResult, PayloadError, QueueError};
use courier_core::traits::{IEventSink, IHitQueue, IKeyValueStore};
use courier_core::{ConsentStatus, Event, Hit, QueueEntry, RequestContext};
use courier_net::{EdgeHttpClient, HttpClientConfig, IEdgeTransport};
use courier_store::{LocationHintCache, ResetWatermark, StoreCache};

use crate::assembler::RequestAssembler;
use crate::callbacks::{CallbackRegistry, CompletionCallback};
use crate::consent_gate::ConsentGate;
use crate::demux::ResponseDemultiplexer;
use crate::processor::EdgeHitProcessor;

/// Wires the pipeline together and accepts work from the host.
///
/// The engine does not drive delivery itself: the host's durable queue
/// calls [`EdgeEngine::processor`] and feeds it entries serially.
pub struct EdgeEngine {
    queue: Arc<dyn IHitQueue>,
    sink: Arc<dyn IEventSink>,
    location_hint: Arc<LocationHintCache>,
    consent: ConsentGate,
    processor: Arc<EdgeHitProcessor>,
    callbacks: Arc<CallbackRegistry>,
}

impl EdgeEngine {
    /// Wire the pipeline against an injected transport.
    pub fn new(
        config: CourierConfig,
        kv: Arc<dyn IKeyValueStore>,
        queue: Arc<dyn IHitQueue>,
        sink: Arc<dyn IEventSink>,
        transport: Arc<dyn IEdgeTransport>,
    ) -> Self {
        let store = Arc::new(StoreCache::open(kv.clone(), &config.store));
        let location_hint = Arc::new(LocationHintCache::open(kv.clone(), &config.store));
        let watermark = Arc::new(ResetWatermark::open(kv, &config.store));
        let callbacks = Arc::new(CallbackRegistry::new());
        let demux = Arc::new(ResponseDemultiplexer::new(
            store.clone(),
            location_hint.clone(),
            watermark.clone(),
            sink.clone(),
            callbacks.clone(),
        ));
        let assembler =
            RequestAssembler::new(config.network.clone(), store.clone(), location_hint.clone());
        let processor = Arc::new(EdgeHitProcessor::new(
            assembler,
            transport,
            demux,
            store,
            watermark,
            callbacks.clone(),
            Duration::from_secs(config.queue.default_retry_interval_secs),
        ));
        Self {
            queue: queue.clone(),
            sink,
            location_hint,
            consent: ConsentGate::new(queue),
            processor,
            callbacks,
        }
    }

    /// Wire the pipeline with the stock blocking HTTP transport.
    pub fn with_http_transport(
        config: CourierConfig,
        kv: Arc<dyn IKeyValueStore>,
        queue: Arc<dyn IHitQueue>,
        sink: Arc<dyn IEventSink>,
    ) -> CourierResult<Self> {
        let transport = Arc::new(EdgeHttpClient::new(HttpClientConfig {
            timeout: Duration::from_secs(config.network.timeout_secs),
            default_retry_interval: Duration::from_secs(config.queue.default_retry_interval_secs),
        })?);
        Ok(Self::new(config, kv, queue, sink, transport))
    }

    /// The processor the host's queue must drive.
    pub fn processor(&self) -> Arc<EdgeHitProcessor> {
        self.processor.clone()
    }

    /// Decide the initial consent state once the host knows whether a
    /// consent authority is present.
    pub fn bootstrap(&self, has_consent_authority: bool) -> CourierResult<()> {
        self.consent.bootstrap(has_consent_authority)
    }

    /// Queue a batch of experience events for delivery.
    ///
    /// The optional completion fires exactly once with every handle
    /// attributed to the batch's first event — immediately with no handles
    /// when consent is denied.
    pub fn submit_experience(
        &self,
        events: Vec<Event>,
        context: RequestContext,
        completion: Option<CompletionCallback>,
    ) -> CourierResult<()> {
        let first = events.first().ok_or(PayloadError::EmptyBatch)?;
        let primary = first.id;
        let timestamp = first.timestamp;

        if self.consent.current()? == ConsentStatus::No {
            debug!(
                count = events.len(),
                "edge: collect consent denied, dropping experience events"
            );
            if let Some(completion) = completion {
                completion(Vec::new());
            }
            return Ok(());
        }

        let entry = QueueEntry::new(
            primary.to_string(),
            timestamp,
            &Hit::Experience { events, context },
        )?;
        if let Some(completion) = completion {
            self.callbacks.register(primary, completion);
        }
        if !self.queue.enqueue(entry) {
            self.callbacks.forget(primary);
            return Err(QueueError::Rejected(format!("experience batch {primary}")).into());
        }
        Ok(())
    }

    /// Queue a consent update and apply its gate effects.
    ///
    /// The gate flips first: a denial clears previously queued experience
    /// hits, and the consent update itself is then queued and still flows.
    pub fn update_consent(&self, event: Event, context: RequestContext) -> CourierResult<()> {
        let preferences = event.consents().ok_or(PayloadError::MissingConsents)?;
        let status = ConsentStatus::from_preferences(preferences);
        self.consent.apply(status)?;
        self.submit_consent(event, context)
    }

    /// Queue a consent update without touching the gate.
    pub fn submit_consent(&self, event: Event, context: RequestContext) -> CourierResult<()> {
        let id = event.id;
        let timestamp = event.timestamp;
        let entry = QueueEntry::new(id.to_string(), timestamp, &Hit::Consent { event, context })?;
        if !self.queue.enqueue(entry) {
            return Err(QueueError::Rejected(format!("consent update {id}")).into());
        }
        Ok(())
    }

    /// Record that identities were reset at `at`. The queued entry clears
    /// the store cache and advances the reset watermark when processed.
    pub fn submit_identity_reset(&self, at: DateTime<Utc>) -> CourierResult<()> {
        let id = Uuid::new_v4();
        let entry = QueueEntry::new(id.to_string(), at, &Hit::ResetIdentities)?;
        if !self.queue.enqueue(entry) {
            return Err(QueueError::Rejected(format!("identity reset {id}")).into());
        }
        Ok(())
    }

    /// Current location hint, if still fresh.
    pub fn location_hint(&self) -> CourierResult<Option<String>> {
        self.location_hint.get()
    }

    /// Host-driven hint override; publishes the new snapshot on change.
    /// An empty hint clears, like `None`.
    pub fn set_location_hint(&self, hint: Option<&str>, ttl_seconds: i64) -> CourierResult<()> {
        if self.location_hint.set(hint, ttl_seconds)? {
            let effective = hint.filter(|h| !h.is_empty()).map(str::to_string);
            self.sink.publish_location_hint(effective);
        }
        Ok(())
    }

    pub fn consent_status(&self) -> CourierResult<ConsentStatus> {
        self.consent.current()
    }

    /// Number of hits awaiting delivery.
    pub fn pending_hits(&self) -> usize {
        self.queue.count()
    }
}
