//! Edge network location hint with a server-assigned time to live.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use courier_core::config::StoreConfig;
use courier_core::errors::{CourierError, CourierResult};
use courier_core::traits::IKeyValueStore;

use crate::keys::{KEY_LOCATION_HINT, KEY_LOCATION_HINT_EXPIRY};

#[derive(Debug, Clone)]
struct HintState {
    hint: String,
    expires_at: DateTime<Utc>,
}

/// The routing hint the server assigns to steer requests to one cluster.
///
/// Persisted as a hint/expiry pair; an expired hint reads as `None` but is
/// left in the host store until the next `set` overwrites or clears it.
pub struct LocationHintCache {
    kv: Arc<dyn IKeyValueStore>,
    namespace: String,
    state: Mutex<Option<HintState>>,
}

impl LocationHintCache {
    pub fn open(kv: Arc<dyn IKeyValueStore>, config: &StoreConfig) -> Self {
        let namespace = config.namespace.clone();
        let state = match (
            kv.get_string(&namespace, KEY_LOCATION_HINT),
            kv.get_i64(&namespace, KEY_LOCATION_HINT_EXPIRY),
        ) {
            (Ok(Some(hint)), Ok(Some(ms))) => match DateTime::from_timestamp_millis(ms) {
                Some(expires_at) => Some(HintState { hint, expires_at }),
                None => {
                    warn!("edge: invalid location hint expiry, ignoring persisted hint");
                    None
                }
            },
            (Err(e), _) | (_, Err(e)) => {
                warn!("edge: failed to read location hint, starting without one: {e}");
                None
            }
            _ => None,
        };
        Self {
            kv,
            namespace,
            state: Mutex::new(state),
        }
    }

    /// Replace the hint. Returns `true` when the effective hint changed.
    ///
    /// `None` or an empty hint clears both the in-memory and persisted
    /// hint. A non-positive ttl stores a hint that is already expired,
    /// which reads as no hint.
    pub fn set(&self, hint: Option<&str>, ttl_seconds: i64) -> CourierResult<bool> {
        self.set_at(hint, ttl_seconds, Utc::now())
    }

    /// [`LocationHintCache::set`] with an explicit receipt time.
    pub fn set_at(
        &self,
        hint: Option<&str>,
        ttl_seconds: i64,
        now: DateTime<Utc>,
    ) -> CourierResult<bool> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| CourierError::lock("location hint"))?;
        let before = effective(&state, now);
        match hint {
            Some(h) if !h.is_empty() => {
                let expires_at = if ttl_seconds <= 0 {
                    now
                } else {
                    Duration::try_seconds(ttl_seconds)
                        .and_then(|ttl| now.checked_add_signed(ttl))
                        .unwrap_or(DateTime::<Utc>::MAX_UTC)
                };
                *state = Some(HintState {
                    hint: h.to_string(),
                    expires_at,
                });
                self.kv.set_string(&self.namespace, KEY_LOCATION_HINT, h)?;
                self.kv.set_i64(
                    &self.namespace,
                    KEY_LOCATION_HINT_EXPIRY,
                    expires_at.timestamp_millis(),
                )?;
            }
            _ => {
                *state = None;
                self.kv.remove(&self.namespace, KEY_LOCATION_HINT)?;
                self.kv.remove(&self.namespace, KEY_LOCATION_HINT_EXPIRY)?;
            }
        }
        let after = effective(&state, now);
        Ok(before != after)
    }

    /// Current hint, `None` once expired.
    pub fn get(&self) -> CourierResult<Option<String>> {
        self.get_at(Utc::now())
    }

    /// [`LocationHintCache::get`] with an explicit evaluation time.
    pub fn get_at(&self, now: DateTime<Utc>) -> CourierResult<Option<String>> {
        let state = self
            .state
            .lock()
            .map_err(|_| CourierError::lock("location hint"))?;
        Ok(effective(&state, now))
    }
}

fn effective(state: &Option<HintState>, now: DateTime<Utc>) -> Option<String> {
    state
        .as_ref()
        .filter(|s| now < s.expires_at)
        .map(|s| s.hint.clone())
}
