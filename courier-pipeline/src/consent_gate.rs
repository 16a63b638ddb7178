//! Consent gating of the durable queue.

use std::sync::{Arc, Mutex};

use tracing::debug;

use courier_core::errors::{CourierError, CourierResult};
use courier_core::traits::IHitQueue;
use courier_core::ConsentStatus;

/// Applies collect-consent transitions to the queue.
///
/// Construction leaves the queue untouched; [`ConsentGate::bootstrap`]
/// decides the initial state once the host reports whether a consent
/// authority is present.
pub struct ConsentGate {
    queue: Arc<dyn IHitQueue>,
    current: Mutex<ConsentStatus>,
}

impl ConsentGate {
    pub fn new(queue: Arc<dyn IHitQueue>) -> Self {
        Self {
            queue,
            current: Mutex::new(ConsentStatus::Pending),
        }
    }

    /// Set the initial state: collect defaults to Yes when no consent
    /// authority exists, otherwise stays Pending until the authority
    /// reports.
    pub fn bootstrap(&self, has_consent_authority: bool) -> CourierResult<()> {
        if has_consent_authority {
            self.apply(ConsentStatus::Pending)
        } else {
            self.apply(ConsentStatus::Yes)
        }
    }

    /// Apply a consent transition. Safe to repeat: re-applying the current
    /// status just re-runs the same idempotent queue effects.
    pub fn apply(&self, status: ConsentStatus) -> CourierResult<()> {
        let mut current = self
            .current
            .lock()
            .map_err(|_| CourierError::lock("consent gate"))?;
        *current = status;
        match status {
            ConsentStatus::Yes => {
                debug!("edge: collect consent granted, queue resumed");
                self.queue.resume();
            }
            ConsentStatus::No => {
                debug!(
                    dropped = self.queue.count(),
                    "edge: collect consent denied, clearing queued hits"
                );
                self.queue.clear();
                // Resumed so reset entries and the consent update itself
                // still flow; experience events are refused upstream.
                self.queue.resume();
            }
            ConsentStatus::Pending => {
                debug!("edge: collect consent pending, queue suspended");
                self.queue.suspend();
            }
        }
        Ok(())
    }

    pub fn current(&self) -> CourierResult<ConsentStatus> {
        let current = self
            .current
            .lock()
            .map_err(|_| CourierError::lock("consent gate"))?;
        Ok(*current)
    }
}
