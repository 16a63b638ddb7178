//! Positional demultiplexing of server responses back to their events.
//!
//! Every batch registers its ordered event ids before the send; each
//! response fragment then resolves to an originating event through its
//! `eventIndex`. Side effects (store entries, location hint) are applied
//! here, and every fragment is surfaced to the host through the sink.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, error, warn};
use uuid::Uuid;

use courier_core::traits::IEventSink;
use courier_core::ResultEvent;
use courier_net::protocol::response::{
    error_event_index, Handle, LocationHintPayload, ResponseChunk, StorePayloadEntry,
    HANDLE_TYPE_LOCATION_HINT, HANDLE_TYPE_STATE_STORE, LOCATION_HINT_SCOPE_EDGE,
};
use courier_store::{LocationHintCache, ResetWatermark, StoreCache};

use crate::callbacks::CallbackRegistry;

/// One in-flight event: its id and when its batch was sent.
#[derive(Debug, Clone, Copy)]
pub struct EventContext {
    pub event_id: Uuid,
    pub sent_at: DateTime<Utc>,
}

/// Maps in-flight batch ids to their ordered event contexts and routes
/// each response fragment to caches, sink, and completion callbacks.
pub struct ResponseDemultiplexer {
    waiting: Mutex<HashMap<String, Vec<EventContext>>>,
    store: Arc<StoreCache>,
    location_hint: Arc<LocationHintCache>,
    watermark: Arc<ResetWatermark>,
    sink: Arc<dyn IEventSink>,
    callbacks: Arc<CallbackRegistry>,
}

impl ResponseDemultiplexer {
    pub fn new(
        store: Arc<StoreCache>,
        location_hint: Arc<LocationHintCache>,
        watermark: Arc<ResetWatermark>,
        sink: Arc<dyn IEventSink>,
        callbacks: Arc<CallbackRegistry>,
    ) -> Self {
        Self {
            waiting: Mutex::new(HashMap::new()),
            store,
            location_hint,
            watermark,
            sink,
            callbacks,
        }
    }

    /// Record a batch before it is sent, so fragments racing the send call
    /// are never lost.
    pub fn register(&self, batch_id: &str, event_ids: &[Uuid]) {
        self.register_at(batch_id, event_ids, Utc::now());
    }

    /// [`ResponseDemultiplexer::register`] with an explicit send time.
    pub fn register_at(&self, batch_id: &str, event_ids: &[Uuid], sent_at: DateTime<Utc>) {
        let contexts: Vec<EventContext> = event_ids
            .iter()
            .map(|&event_id| EventContext { event_id, sent_at })
            .collect();
        let Ok(mut waiting) = self.waiting.lock() else {
            error!("edge: demux lock poisoned, batch {batch_id} not registered");
            return;
        };
        if waiting.insert(batch_id.to_string(), contexts).is_some() {
            warn!("edge: batch id {batch_id} collided, previous registration replaced");
        }
    }

    /// Drop a batch mapping without firing completions. Used when a send
    /// will be retried: no more fragments can arrive for this batch id,
    /// but the per-event completion registrations stay alive for the next
    /// attempt.
    pub fn withdraw(&self, batch_id: &str) {
        let Ok(mut waiting) = self.waiting.lock() else {
            error!("edge: demux lock poisoned on withdraw");
            return;
        };
        waiting.remove(batch_id);
    }

    /// One success fragment: apply side effects, then dispatch results.
    pub fn on_fragment(&self, batch_id: &str, fragment: &Value) {
        let chunk: ResponseChunk = match serde_json::from_value(fragment.clone()) {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!("edge: unintelligible response fragment for batch {batch_id}: {e}");
                return;
            }
        };
        for handle in &chunk.handle {
            self.on_handle(batch_id, handle);
        }
        self.on_errors(batch_id, &chunk.errors, false);
        self.on_errors(batch_id, &chunk.warnings, true);
    }

    /// The error body of an unrecoverable exchange. A body carrying an
    /// `errors` array is split up; anything else is one error.
    pub fn on_error_body(&self, batch_id: &str, body: &Value) {
        match body.get("errors").and_then(Value::as_array) {
            Some(errors) if !errors.is_empty() => self.on_errors(batch_id, errors, false),
            _ => self.on_errors(batch_id, std::slice::from_ref(body), false),
        }
    }

    /// Terminal completion for a batch: drop the mapping and fire the
    /// completion callbacks of its events. Calling it again is a no-op.
    pub fn release(&self, batch_id: &str) {
        let contexts = {
            let Ok(mut waiting) = self.waiting.lock() else {
                error!("edge: demux lock poisoned on release");
                return;
            };
            waiting.remove(batch_id)
        };
        let Some(contexts) = contexts else {
            return;
        };
        for context in contexts {
            self.callbacks.complete(context.event_id);
        }
    }

    /// Number of batches currently awaiting fragments.
    pub fn in_flight(&self) -> usize {
        self.waiting.lock().map(|w| w.len()).unwrap_or(0)
    }

    fn on_handle(&self, batch_id: &str, handle: &Handle) {
        let (context, batch_sent_at) = self.resolve(batch_id, handle.index());

        match handle.handle_type.as_str() {
            HANDLE_TYPE_STATE_STORE => self.apply_store_payloads(batch_id, handle, batch_sent_at),
            HANDLE_TYPE_LOCATION_HINT => self.apply_location_hints(handle),
            _ => {}
        }

        if let Some(context) = context {
            let raw = serde_json::to_value(handle).unwrap_or(Value::Null);
            self.callbacks.append(context.event_id, raw);
        }
        self.sink.dispatch_result(ResultEvent::Handle {
            handle_type: handle.handle_type.clone(),
            payload: Value::Array(handle.payload.clone()),
            event_id: context.map(|c| c.event_id),
            batch_id: batch_id.to_string(),
        });
    }

    fn on_errors(&self, batch_id: &str, items: &[Value], warning: bool) {
        for item in items {
            let (context, _) = self.resolve(batch_id, error_event_index(item));
            if warning {
                warn!("edge: server warning for batch {batch_id}: {item}");
            } else {
                error!("edge: server error for batch {batch_id}: {item}");
            }
            self.sink.dispatch_result(ResultEvent::Error {
                body: item.clone(),
                warning,
                event_id: context.map(|c| c.event_id),
                batch_id: batch_id.to_string(),
            });
        }
    }

    /// Store instructions are dropped whole when the batch was sent before
    /// the last identity reset; the cleared store must not be repopulated
    /// with pre-reset state.
    fn apply_store_payloads(
        &self,
        batch_id: &str,
        handle: &Handle,
        batch_sent_at: Option<DateTime<Utc>>,
    ) {
        let last_reset = match self.watermark.get() {
            Ok(last_reset) => last_reset,
            Err(e) => {
                error!("edge: reset watermark unreadable, store payloads dropped: {e}");
                return;
            }
        };
        let stale = match (last_reset, batch_sent_at) {
            (Some(reset), Some(sent_at)) => sent_at < reset,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if stale {
            debug!("edge: discarding store payloads for batch {batch_id}, sent before identity reset");
            return;
        }
        for item in &handle.payload {
            match serde_json::from_value::<StorePayloadEntry>(item.clone()) {
                Ok(entry) => {
                    if let Err(e) = self.store.set(&entry.key, &entry.value, entry.max_age) {
                        error!("edge: failed to cache store entry {}: {e}", entry.key);
                    }
                }
                Err(e) => warn!("edge: malformed store payload skipped: {e}"),
            }
        }
    }

    fn apply_location_hints(&self, handle: &Handle) {
        for item in &handle.payload {
            let hint = match serde_json::from_value::<LocationHintPayload>(item.clone()) {
                Ok(hint) => hint,
                Err(e) => {
                    warn!("edge: malformed location hint skipped: {e}");
                    continue;
                }
            };
            if hint.scope != LOCATION_HINT_SCOPE_EDGE {
                continue;
            }
            match self.location_hint.set(Some(&hint.hint), hint.ttl_seconds) {
                // An empty hint is a clear; publish the effective value.
                Ok(true) => self
                    .sink
                    .publish_location_hint((!hint.hint.is_empty()).then(|| hint.hint.clone())),
                Ok(false) => {}
                Err(e) => error!("edge: failed to cache location hint: {e}"),
            }
        }
    }

    fn resolve(&self, batch_id: &str, index: usize) -> (Option<EventContext>, Option<DateTime<Utc>>) {
        let Ok(waiting) = self.waiting.lock() else {
            error!("edge: demux lock poisoned");
            return (None, None);
        };
        match waiting.get(batch_id) {
            Some(contexts) => (
                contexts.get(index).copied(),
                contexts.first().map(|c| c.sent_at),
            ),
            None => {
                debug!("edge: fragment for unknown batch {batch_id}");
                (None, None)
            }
        }
    }
}
