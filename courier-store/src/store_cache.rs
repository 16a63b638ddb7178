//! TTL-bounded cache of server `state:store` payload entries.
//!
//! The server hands back small key/value pairs with a lifetime; they must be
//! echoed under `meta.state.entries` on every later request until they
//! expire or the server deletes them with a non-positive max-age.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use courier_core::config::StoreConfig;
use courier_core::errors::{CourierError, CourierResult, StoreError};
use courier_core::traits::IKeyValueStore;

use crate::keys::KEY_STORE_PAYLOADS;

/// One cached server-state entry with its absolute expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreEntry {
    pub key: String,
    pub value: String,
    /// Lifetime in seconds as reported by the server.
    pub max_age: i64,
    /// Expiry computed when the entry was received.
    pub expires_at: DateTime<Utc>,
}

impl StoreEntry {
    pub fn new(
        key: impl Into<String>,
        value: impl Into<String>,
        max_age: i64,
        received_at: DateTime<Utc>,
    ) -> Self {
        let expires_at = Duration::try_seconds(max_age)
            .and_then(|ttl| received_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            key: key.into(),
            value: value.into(),
            max_age,
            expires_at,
        }
    }

    /// Whether the entry is still usable at `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// In-memory map of store entries mirrored into the host key/value store.
pub struct StoreCache {
    kv: Arc<dyn IKeyValueStore>,
    namespace: String,
    entries: Mutex<HashMap<String, StoreEntry>>,
}

impl StoreCache {
    /// Load the cache from the host store.
    ///
    /// Corrupt or unreadable persisted state is logged and replaced with an
    /// empty cache; the client must come up regardless.
    pub fn open(kv: Arc<dyn IKeyValueStore>, config: &StoreConfig) -> Self {
        let entries = match kv.get_string(&config.namespace, KEY_STORE_PAYLOADS) {
            Ok(Some(raw)) => match serde_json::from_str::<HashMap<String, StoreEntry>>(&raw) {
                Ok(map) => map,
                Err(e) => {
                    warn!("edge: corrupt store payload cache, starting empty: {e}");
                    HashMap::new()
                }
            },
            Ok(None) => HashMap::new(),
            Err(e) => {
                warn!("edge: failed to read store payload cache, starting empty: {e}");
                HashMap::new()
            }
        };
        Self {
            kv,
            namespace: config.namespace.clone(),
            entries: Mutex::new(entries),
        }
    }

    /// Apply one server entry. A non-positive max-age deletes the key.
    pub fn set(&self, key: &str, value: &str, max_age: i64) -> CourierResult<()> {
        self.set_at(key, value, max_age, Utc::now())
    }

    /// [`StoreCache::set`] with an explicit receipt time.
    pub fn set_at(
        &self,
        key: &str,
        value: &str,
        max_age: i64,
        received_at: DateTime<Utc>,
    ) -> CourierResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CourierError::lock("store cache"))?;
        if max_age <= 0 {
            if entries.remove(key).is_some() {
                debug!("edge: store entry {key} deleted by server");
            }
        } else {
            entries.insert(
                key.to_string(),
                StoreEntry::new(key, value, max_age, received_at),
            );
        }
        self.persist(&entries)
    }

    /// Entries still alive now; expired ones are evicted on the way out.
    pub fn all_active(&self) -> CourierResult<Vec<StoreEntry>> {
        self.all_active_at(Utc::now())
    }

    /// [`StoreCache::all_active`] with an explicit evaluation time.
    pub fn all_active_at(&self, now: DateTime<Utc>) -> CourierResult<Vec<StoreEntry>> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CourierError::lock("store cache"))?;
        let before = entries.len();
        entries.retain(|_, e| e.is_active(now));
        if entries.len() != before {
            debug!(
                evicted = before - entries.len(),
                "edge: expired store entries evicted"
            );
            self.persist(&entries)?;
        }
        // Sorted so request bodies are deterministic.
        let mut active: Vec<StoreEntry> = entries.values().cloned().collect();
        active.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(active)
    }

    /// Drop every entry, including the persisted copy.
    pub fn clear_all(&self) -> CourierResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CourierError::lock("store cache"))?;
        entries.clear();
        self.kv.remove(&self.namespace, KEY_STORE_PAYLOADS)
    }

    pub fn is_empty(&self) -> CourierResult<bool> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| CourierError::lock("store cache"))?;
        Ok(entries.is_empty())
    }

    fn persist(&self, entries: &HashMap<String, StoreEntry>) -> CourierResult<()> {
        let raw = serde_json::to_string(entries).map_err(|e| StoreError::PersistFailed {
            key: KEY_STORE_PAYLOADS.to_string(),
            reason: e.to_string(),
        })?;
        self.kv.set_string(&self.namespace, KEY_STORE_PAYLOADS, &raw)
    }
}
