//! Identity-reset watermark.
//!
//! Records when identities were last reset. Store payload handles from
//! requests sent before that instant are stale and must be ignored.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::warn;

use courier_core::config::StoreConfig;
use courier_core::errors::{CourierError, CourierResult};
use courier_core::traits::IKeyValueStore;

use crate::keys::KEY_RESET_IDENTITIES_DATE;

pub struct ResetWatermark {
    kv: Arc<dyn IKeyValueStore>,
    namespace: String,
    last_reset: Mutex<Option<DateTime<Utc>>>,
}

impl ResetWatermark {
    pub fn open(kv: Arc<dyn IKeyValueStore>, config: &StoreConfig) -> Self {
        let namespace = config.namespace.clone();
        let last_reset = match kv.get_i64(&namespace, KEY_RESET_IDENTITIES_DATE) {
            Ok(Some(ms)) => {
                let parsed = DateTime::from_timestamp_millis(ms);
                if parsed.is_none() {
                    warn!("edge: invalid reset watermark {ms}, ignoring");
                }
                parsed
            }
            Ok(None) => None,
            Err(e) => {
                warn!("edge: failed to read reset watermark: {e}");
                None
            }
        };
        Self {
            kv,
            namespace,
            last_reset: Mutex::new(last_reset),
        }
    }

    /// Record a reset at `at` and persist it.
    pub fn set(&self, at: DateTime<Utc>) -> CourierResult<()> {
        let mut last_reset = self
            .last_reset
            .lock()
            .map_err(|_| CourierError::lock("reset watermark"))?;
        *last_reset = Some(at);
        self.kv.set_i64(
            &self.namespace,
            KEY_RESET_IDENTITIES_DATE,
            at.timestamp_millis(),
        )
    }

    /// The last reset instant, if any reset ever happened.
    pub fn get(&self) -> CourierResult<Option<DateTime<Utc>>> {
        let last_reset = self
            .last_reset
            .lock()
            .map_err(|_| CourierError::lock("reset watermark"))?;
        Ok(*last_reset)
    }
}
