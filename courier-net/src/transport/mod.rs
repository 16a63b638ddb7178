//! The transport seam between the pipeline and the Edge network.
//!
//! A send is strictly blocking: the listener sees every fragment and the
//! completion signal before the outcome is returned, so the caller can key
//! retry decisions off a fully consumed response.

pub mod client;
pub mod stream;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::transport::stream::StreamFraming;

/// Terminal outcome of one send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The server accepted the batch; the full response went to the listener.
    Delivered,
    /// Recoverable failure. Retry the same hit after the delay; the listener
    /// saw no completion.
    Retry { after: Duration },
    /// Unrecoverable failure; the error body went to the listener.
    Failed,
}

/// Callbacks fed while a response is consumed.
pub trait ResponseListener {
    /// One parsed success chunk — a streamed record or the whole body.
    fn on_fragment(&self, fragment: &Value);

    /// The error body of an unrecoverable failure.
    fn on_error_fragment(&self, body: &Value);

    /// The response is fully consumed. Fires exactly once for
    /// [`SendOutcome::Delivered`] and [`SendOutcome::Failed`], never for a
    /// retry.
    fn on_complete(&self);
}

/// One fully assembled request, ready to send as-is.
#[derive(Debug, Clone)]
pub struct EdgeRequest {
    pub url: String,
    pub body: Value,
    pub headers: HashMap<String, String>,
    /// When set, a 200 response is parsed as framed records.
    pub streaming: Option<StreamFraming>,
}

/// Trait for the blocking HTTP exchange.
pub trait IEdgeTransport: Send + Sync {
    fn send(&self, request: &EdgeRequest, listener: &dyn ResponseListener) -> SendOutcome;
}

impl<T: IEdgeTransport + ?Sized> IEdgeTransport for Arc<T> {
    fn send(&self, request: &EdgeRequest, listener: &dyn ResponseListener) -> SendOutcome {
        (**self).send(request, listener)
    }
}
