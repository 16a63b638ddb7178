//! One-shot completion callbacks keyed by event id.
//!
//! Register once, fire once, then forget: handles collect against the
//! registration while the batch is in flight, and the callback runs exactly
//! once when the batch reaches a terminal outcome.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;
use tracing::{error, warn};
use uuid::Uuid;

/// Invoked once with every handle attributed to the event.
pub type CompletionCallback = Box<dyn FnOnce(Vec<Value>) + Send>;

struct PendingCompletion {
    callback: CompletionCallback,
    handles: Vec<Value>,
}

#[derive(Default)]
pub struct CallbackRegistry {
    pending: Mutex<HashMap<Uuid, PendingCompletion>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a completion for an event. A second registration for the
    /// same event replaces the first, which is dropped unfired.
    pub fn register(&self, event_id: Uuid, callback: CompletionCallback) {
        let Ok(mut pending) = self.pending.lock() else {
            error!("edge: callback registry lock poisoned, dropping registration");
            return;
        };
        let replaced = pending
            .insert(
                event_id,
                PendingCompletion {
                    callback,
                    handles: Vec::new(),
                },
            )
            .is_some();
        if replaced {
            warn!("edge: completion for event {event_id} replaced an earlier one");
        }
    }

    /// Append one handle to the event's pending completion, if any.
    pub fn append(&self, event_id: Uuid, handle: Value) {
        let Ok(mut pending) = self.pending.lock() else {
            error!("edge: callback registry lock poisoned, dropping handle");
            return;
        };
        if let Some(completion) = pending.get_mut(&event_id) {
            completion.handles.push(handle);
        }
    }

    /// Remove a registration without firing it. Used when the submission
    /// it belongs to is rejected before anything is in flight.
    pub fn forget(&self, event_id: Uuid) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.remove(&event_id);
        }
    }

    /// Fire and forget the event's completion, if one is registered.
    ///
    /// The callback runs outside the registry lock.
    pub fn complete(&self, event_id: Uuid) {
        let completion = {
            let Ok(mut pending) = self.pending.lock() else {
                error!("edge: callback registry lock poisoned, completion lost");
                return;
            };
            pending.remove(&event_id)
        };
        if let Some(completion) = completion {
            (completion.callback)(completion.handles);
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }
}
