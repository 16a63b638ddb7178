//! The hit processor the durable queue drives, one entry at a time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, error};
use uuid::Uuid;

use courier_core::traits::{HitResult, IHitProcessor};
use courier_core::{Hit, QueueEntry};
use courier_net::{IEdgeTransport, ResponseListener, SendOutcome};
use courier_store::{ResetWatermark, StoreCache};

use crate::assembler::{AssembledRequest, RequestAssembler};
use crate::callbacks::CallbackRegistry;
use crate::demux::ResponseDemultiplexer;

/// Maps queue entries to send attempts and their terminal verdicts.
///
/// Every failure path resolves to [`HitResult::Done`] (drop) or
/// [`HitResult::Retry`]; nothing escapes to the queue as a fault.
pub struct EdgeHitProcessor {
    assembler: RequestAssembler,
    transport: Arc<dyn IEdgeTransport>,
    demux: Arc<ResponseDemultiplexer>,
    store: Arc<StoreCache>,
    watermark: Arc<ResetWatermark>,
    callbacks: Arc<CallbackRegistry>,
    default_retry_interval: Duration,
    /// Server-suggested retry delays, remembered per entry until retired.
    retry_overrides: Mutex<HashMap<String, Duration>>,
}

impl EdgeHitProcessor {
    pub fn new(
        assembler: RequestAssembler,
        transport: Arc<dyn IEdgeTransport>,
        demux: Arc<ResponseDemultiplexer>,
        store: Arc<StoreCache>,
        watermark: Arc<ResetWatermark>,
        callbacks: Arc<CallbackRegistry>,
        default_retry_interval: Duration,
    ) -> Self {
        Self {
            assembler,
            transport,
            demux,
            store,
            watermark,
            callbacks,
            default_retry_interval,
            retry_overrides: Mutex::new(HashMap::new()),
        }
    }

    fn send_registered(
        &self,
        entry: &QueueEntry,
        assembled: AssembledRequest,
        event_ids: &[Uuid],
    ) -> HitResult {
        // Register before sending so fragments racing the send call are
        // never lost.
        self.demux.register(&assembled.batch_id, event_ids);
        let listener = DemuxListener {
            demux: &self.demux,
            batch_id: &assembled.batch_id,
        };
        match self.transport.send(&assembled.request, &listener) {
            SendOutcome::Delivered | SendOutcome::Failed => {
                // Idempotent when the transport already signalled completion.
                self.demux.release(&assembled.batch_id);
                self.clear_retry_override(&entry.id);
                HitResult::Done
            }
            SendOutcome::Retry { after } => {
                // No more fragments can arrive under this batch id; the
                // per-event completion registrations stay for the retry.
                self.demux.withdraw(&assembled.batch_id);
                self.set_retry_override(&entry.id, after);
                HitResult::Retry { after }
            }
        }
    }

    /// Drop an entry before any send, firing its completions so the host
    /// never waits on a hit that will not go out.
    fn drop_unsent(&self, entry: &QueueEntry, event_ids: &[Uuid], reason: &str) -> HitResult {
        debug!("edge: dropping hit {}: {reason}", entry.id);
        for event_id in event_ids {
            self.callbacks.complete(*event_id);
        }
        HitResult::Done
    }

    fn set_retry_override(&self, entry_id: &str, after: Duration) {
        if let Ok(mut overrides) = self.retry_overrides.lock() {
            overrides.insert(entry_id.to_string(), after);
        }
    }

    fn clear_retry_override(&self, entry_id: &str) {
        if let Ok(mut overrides) = self.retry_overrides.lock() {
            overrides.remove(entry_id);
        }
    }
}

impl IHitProcessor for EdgeHitProcessor {
    fn retry_interval(&self, entry: &QueueEntry) -> Duration {
        self.retry_overrides
            .lock()
            .ok()
            .and_then(|overrides| overrides.get(&entry.id).copied())
            .unwrap_or(self.default_retry_interval)
    }

    fn process(&self, entry: &QueueEntry) -> HitResult {
        let hit = match entry.hit() {
            Ok(hit) => hit,
            Err(e) => {
                // Poison entries must never block the queue.
                let ids: Vec<Uuid> = Uuid::parse_str(&entry.id).into_iter().collect();
                return self.drop_unsent(entry, &ids, &format!("unreadable payload: {e}"));
            }
        };

        match hit {
            Hit::ResetIdentities => {
                if let Err(e) = self.store.clear_all() {
                    error!("edge: store clear on identity reset failed: {e}");
                }
                if let Err(e) = self.watermark.set(entry.timestamp) {
                    error!("edge: reset watermark not persisted: {e}");
                }
                HitResult::Done
            }
            Hit::Experience { events, context } => {
                let event_ids: Vec<Uuid> = events.iter().map(|e| e.id).collect();
                match self.assembler.build_experience(&events, &context) {
                    Ok(assembled) => self.send_registered(entry, assembled, &event_ids),
                    Err(e) => {
                        self.drop_unsent(entry, &event_ids, &format!("request build failed: {e}"))
                    }
                }
            }
            Hit::Consent { event, context } => {
                let event_ids = [event.id];
                match self.assembler.build_consent(&event, &context) {
                    Ok(assembled) => self.send_registered(entry, assembled, &event_ids),
                    Err(e) => {
                        self.drop_unsent(entry, &event_ids, &format!("request build failed: {e}"))
                    }
                }
            }
        }
    }
}

struct DemuxListener<'a> {
    demux: &'a ResponseDemultiplexer,
    batch_id: &'a str,
}

impl ResponseListener for DemuxListener<'_> {
    fn on_fragment(&self, fragment: &Value) {
        self.demux.on_fragment(self.batch_id, fragment);
    }

    fn on_error_fragment(&self, body: &Value) {
        self.demux.on_error_body(self.batch_id, body);
    }

    fn on_complete(&self) {
        self.demux.release(self.batch_id);
    }
}
