//! In-memory test doubles for the courier pipeline.
//!
//! Fakes for every host-provided capability (key/value store, durable
//! queue, event sink) plus a scripted transport, so pipeline behavior can
//! be tested without I/O. Misusing a fixture (e.g. running a scripted
//! transport past its script) panics with a descriptive message.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use serde_json::Value;

use courier_core::errors::{CourierError, CourierResult};
use courier_core::traits::{HitResult, IEventSink, IHitProcessor, IHitQueue, IKeyValueStore};
use courier_core::{Event, QueueEntry, ResultEvent};
use courier_net::{EdgeRequest, IEdgeTransport, ResponseListener, SendOutcome};

// ─── Key/value store ───────────────────────────────────────

/// Host key/value persistence backed by a plain map.
#[derive(Default)]
pub struct MemoryKeyValueStore {
    values: Mutex<HashMap<(String, String), String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IKeyValueStore for MemoryKeyValueStore {
    fn get_string(&self, namespace: &str, key: &str) -> CourierResult<Option<String>> {
        let values = self
            .values
            .lock()
            .map_err(|_| CourierError::lock("memory kv"))?;
        Ok(values.get(&(namespace.to_string(), key.to_string())).cloned())
    }

    fn set_string(&self, namespace: &str, key: &str, value: &str) -> CourierResult<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| CourierError::lock("memory kv"))?;
        values.insert((namespace.to_string(), key.to_string()), value.to_string());
        Ok(())
    }

    fn get_i64(&self, namespace: &str, key: &str) -> CourierResult<Option<i64>> {
        Ok(self
            .get_string(namespace, key)?
            .and_then(|raw| raw.parse().ok()))
    }

    fn set_i64(&self, namespace: &str, key: &str, value: i64) -> CourierResult<()> {
        self.set_string(namespace, key, &value.to_string())
    }

    fn remove(&self, namespace: &str, key: &str) -> CourierResult<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| CourierError::lock("memory kv"))?;
        values.remove(&(namespace.to_string(), key.to_string()));
        Ok(())
    }
}

// ─── Durable hit queue ─────────────────────────────────────

/// In-memory FIFO honoring the durable-queue contract: entries are offered
/// to the processor one at a time, a `Retry` keeps the head in place, and
/// nothing is offered while suspended.
///
/// Tests drive it explicitly with [`MemoryHitQueue::process_next`] /
/// [`MemoryHitQueue::drain`]; retry delays are returned, not slept.
#[derive(Default)]
pub struct MemoryHitQueue {
    entries: Mutex<VecDeque<QueueEntry>>,
    suspended: AtomicBool,
}

impl MemoryHitQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer the head entry to `processor`. `None` when suspended or empty.
    pub fn process_next(&self, processor: &dyn IHitProcessor) -> Option<HitResult> {
        if self.suspended.load(Ordering::SeqCst) {
            return None;
        }
        let head = self
            .entries
            .lock()
            .expect("queue lock poisoned")
            .front()
            .cloned()?;
        let result = processor.process(&head);
        if matches!(result, HitResult::Done) {
            let mut entries = self.entries.lock().expect("queue lock poisoned");
            // The queue may have been cleared while processing.
            if entries.front().map(|e| e.id == head.id).unwrap_or(false) {
                entries.pop_front();
            }
        }
        Some(result)
    }

    /// Process entries until one asks for a retry, the queue suspends, or
    /// it runs dry. Returns how many completed.
    pub fn drain(&self, processor: &dyn IHitProcessor) -> usize {
        let mut completed = 0;
        while let Some(HitResult::Done) = self.process_next(processor) {
            completed += 1;
        }
        completed
    }

    /// Snapshot of the queued entries, head first.
    pub fn entries(&self) -> Vec<QueueEntry> {
        self.entries
            .lock()
            .expect("queue lock poisoned")
            .iter()
            .cloned()
            .collect()
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::SeqCst)
    }
}

impl IHitQueue for MemoryHitQueue {
    fn enqueue(&self, entry: QueueEntry) -> bool {
        self.entries
            .lock()
            .expect("queue lock poisoned")
            .push_back(entry);
        true
    }

    fn suspend(&self) {
        self.suspended.store(true, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.suspended.store(false, Ordering::SeqCst);
    }

    fn clear(&self) {
        self.entries.lock().expect("queue lock poisoned").clear();
    }

    fn count(&self) -> usize {
        self.entries.lock().expect("queue lock poisoned").len()
    }
}

// ─── Event sink ────────────────────────────────────────────

/// Records every dispatched result and location-hint announcement.
#[derive(Default)]
pub struct CapturingEventSink {
    results: Mutex<Vec<ResultEvent>>,
    hints: Mutex<Vec<Option<String>>>,
}

impl CapturingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn results(&self) -> Vec<ResultEvent> {
        self.results.lock().expect("sink lock poisoned").clone()
    }

    pub fn hints(&self) -> Vec<Option<String>> {
        self.hints.lock().expect("sink lock poisoned").clone()
    }
}

impl IEventSink for CapturingEventSink {
    fn dispatch_result(&self, result: ResultEvent) {
        self.results.lock().expect("sink lock poisoned").push(result);
    }

    fn publish_location_hint(&self, hint: Option<String>) {
        self.hints.lock().expect("sink lock poisoned").push(hint);
    }
}

// ─── Scripted transport ────────────────────────────────────

/// One pre-scripted server exchange.
pub struct ScriptedExchange {
    pub fragments: Vec<Value>,
    pub error_fragment: Option<Value>,
    pub outcome: SendOutcome,
}

impl ScriptedExchange {
    /// Success with the given response fragments.
    pub fn delivered(fragments: Vec<Value>) -> Self {
        Self {
            fragments,
            error_fragment: None,
            outcome: SendOutcome::Delivered,
        }
    }

    /// 204-style success with no body.
    pub fn no_content() -> Self {
        Self::delivered(Vec::new())
    }

    /// Recoverable failure.
    pub fn retry(after: std::time::Duration) -> Self {
        Self {
            fragments: Vec::new(),
            error_fragment: None,
            outcome: SendOutcome::Retry { after },
        }
    }

    /// Unrecoverable failure with the given error body.
    pub fn failed(error: Value) -> Self {
        Self {
            fragments: Vec::new(),
            error_fragment: Some(error),
            outcome: SendOutcome::Failed,
        }
    }
}

/// Transport that replays scripted exchanges and captures every request.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<ScriptedExchange>>,
    requests: Mutex<Vec<EdgeRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, exchange: ScriptedExchange) {
        self.script
            .lock()
            .expect("script lock poisoned")
            .push_back(exchange);
    }

    /// Every request sent so far, in order.
    pub fn requests(&self) -> Vec<EdgeRequest> {
        self.requests
            .lock()
            .expect("script lock poisoned")
            .clone()
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().expect("script lock poisoned").len()
    }
}

impl IEdgeTransport for ScriptedTransport {
    fn send(&self, request: &EdgeRequest, listener: &dyn ResponseListener) -> SendOutcome {
        self.requests
            .lock()
            .expect("script lock poisoned")
            .push(request.clone());
        let exchange = self
            .script
            .lock()
            .expect("script lock poisoned")
            .pop_front()
            .unwrap_or_else(|| panic!("scripted transport ran out of exchanges"));

        for fragment in &exchange.fragments {
            listener.on_fragment(fragment);
        }
        if let Some(body) = &exchange.error_fragment {
            listener.on_error_fragment(body);
        }
        match exchange.outcome {
            SendOutcome::Retry { .. } => {}
            SendOutcome::Delivered | SendOutcome::Failed => listener.on_complete(),
        }
        exchange.outcome
    }
}

// ─── Event builders ────────────────────────────────────────

/// An experience event with the given XDM event type.
pub fn xdm_event(event_type: &str) -> Event {
    let data = serde_json::json!({ "xdm": { "eventType": event_type } });
    match data {
        Value::Object(map) => Event::new(map),
        _ => unreachable!(),
    }
}

/// A consent event carrying a collect preference ("y"/"n"/"p").
pub fn consent_event(collect_val: &str) -> Event {
    let data = serde_json::json!({
        "consents": { "collect": { "val": collect_val } }
    });
    match data {
        Value::Object(map) => Event::new(map),
        _ => unreachable!(),
    }
}
