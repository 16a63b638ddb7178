//! Outbound delivery of per-event server results to the host.

use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

/// One server result attributed to a single originating event.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultEvent {
    /// A response handle (state update, identity result, personalization...).
    Handle {
        /// Server handle type, e.g. `state:store` or `locationHint:result`.
        handle_type: String,
        /// The handle's payload items, as received.
        payload: Value,
        /// The originating event, when the batch position resolved to one.
        event_id: Option<Uuid>,
        /// Request id of the batch the handle arrived in.
        batch_id: String,
    },
    /// A non-fatal error or warning reported by the server.
    Error {
        /// The error object as received.
        body: Value,
        /// `true` for warnings, `false` for errors.
        warning: bool,
        event_id: Option<Uuid>,
        batch_id: String,
    },
}

impl ResultEvent {
    pub fn batch_id(&self) -> &str {
        match self {
            ResultEvent::Handle { batch_id, .. } => batch_id,
            ResultEvent::Error { batch_id, .. } => batch_id,
        }
    }

    pub fn event_id(&self) -> Option<Uuid> {
        match self {
            ResultEvent::Handle { event_id, .. } => *event_id,
            ResultEvent::Error { event_id, .. } => *event_id,
        }
    }
}

/// Trait for the host-facing result channel.
pub trait IEventSink: Send + Sync {
    /// Deliver one attributed result to the host.
    fn dispatch_result(&self, result: ResultEvent);

    /// Announce the current location hint; `None` clears it.
    fn publish_location_hint(&self, hint: Option<String>);
}

impl<T: IEventSink + ?Sized> IEventSink for Arc<T> {
    fn dispatch_result(&self, result: ResultEvent) {
        (**self).dispatch_result(result)
    }

    fn publish_location_hint(&self, hint: Option<String>) {
        (**self).publish_location_hint(hint)
    }
}
