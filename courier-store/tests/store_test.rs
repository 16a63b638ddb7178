//! Tests for courier-store: payload cache TTL and persistence, location
//! hint lifetime, and the identity-reset watermark.

use std::sync::Arc;

use chrono::{Duration, Utc};

use courier_core::config::StoreConfig;
use courier_core::traits::IKeyValueStore;
use courier_store::keys::{KEY_LOCATION_HINT, KEY_STORE_PAYLOADS};
use courier_store::{LocationHintCache, ResetWatermark, StoreCache};
use test_fixtures::MemoryKeyValueStore;

// ─── Helpers ───────────────────────────────────────────────

fn kv() -> Arc<MemoryKeyValueStore> {
    Arc::new(MemoryKeyValueStore::new())
}

fn config() -> StoreConfig {
    StoreConfig::default()
}

// ─── Store payload cache ───────────────────────────────────

#[test]
fn test_set_and_read_back_active_entries() {
    let cache = StoreCache::open(kv(), &config());
    cache.set("kndctr_cluster", "or2", 1800).unwrap();
    cache.set("kndctr_consent", "in", 7200).unwrap();

    let active = cache.all_active().unwrap();
    assert_eq!(active.len(), 2);
    assert_eq!(active[0].key, "kndctr_cluster");
    assert_eq!(active[0].value, "or2");
    assert_eq!(active[1].key, "kndctr_consent");
}

#[test]
fn test_entries_expire_after_max_age() {
    let now = Utc::now();
    let cache = StoreCache::open(kv(), &config());
    cache.set_at("short", "v", 60, now).unwrap();

    assert_eq!(
        cache.all_active_at(now + Duration::seconds(59)).unwrap().len(),
        1
    );
    assert!(cache
        .all_active_at(now + Duration::seconds(60))
        .unwrap()
        .is_empty());
}

#[test]
fn test_non_positive_max_age_deletes_entry() {
    let cache = StoreCache::open(kv(), &config());
    cache.set("k", "v", 1800).unwrap();
    cache.set("k", "", 0).unwrap();

    assert!(cache.all_active().unwrap().is_empty());
    // Deleting something that was never stored is a no-op.
    cache.set("ghost", "", -5).unwrap();
    assert!(cache.all_active().unwrap().is_empty());
}

#[test]
fn test_cache_survives_reopen() {
    let store = kv();
    {
        let cache = StoreCache::open(store.clone(), &config());
        cache.set("k", "v", 1800).unwrap();
    }

    let reopened = StoreCache::open(store, &config());
    let active = reopened.all_active().unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].value, "v");
}

#[test]
fn test_eviction_is_persisted() {
    let now = Utc::now();
    let store = kv();
    let cache = StoreCache::open(store.clone(), &config());
    cache.set_at("short", "a", 60, now).unwrap();
    cache.set_at("long", "b", 3600, now).unwrap();

    // Reading past the first expiry evicts it from the persisted copy too.
    let active = cache.all_active_at(now + Duration::seconds(120)).unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].key, "long");

    let reopened = StoreCache::open(store, &config());
    let active = reopened
        .all_active_at(now + Duration::seconds(120))
        .unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].key, "long");
}

#[test]
fn test_corrupt_persisted_state_starts_empty() {
    let store = kv();
    let ns = config().namespace;
    store
        .set_string(&ns, KEY_STORE_PAYLOADS, "{not json")
        .unwrap();

    let cache = StoreCache::open(store.clone(), &config());
    assert!(cache.all_active().unwrap().is_empty());

    // A later write repairs the persisted copy.
    cache.set("k", "v", 1800).unwrap();
    let reopened = StoreCache::open(store, &config());
    assert_eq!(reopened.all_active().unwrap().len(), 1);
}

#[test]
fn test_clear_all_removes_persisted_state() {
    let store = kv();
    let ns = config().namespace;
    let cache = StoreCache::open(store.clone(), &config());
    cache.set("k", "v", 1800).unwrap();

    cache.clear_all().unwrap();
    assert!(cache.all_active().unwrap().is_empty());
    assert!(store.get_string(&ns, KEY_STORE_PAYLOADS).unwrap().is_none());
}

// ─── Location hint ─────────────────────────────────────────

#[test]
fn test_hint_round_trip_with_ttl() {
    let now = Utc::now();
    let cache = LocationHintCache::open(kv(), &config());
    let changed = cache.set_at(Some("or2"), 1800, now).unwrap();
    assert!(changed);

    assert_eq!(
        cache.get_at(now + Duration::seconds(1799)).unwrap(),
        Some("or2".to_string())
    );
    assert_eq!(cache.get_at(now + Duration::seconds(1800)).unwrap(), None);
}

#[test]
fn test_set_same_hint_reports_unchanged() {
    let cache = LocationHintCache::open(kv(), &config());
    assert!(cache.set(Some("or2"), 1800).unwrap());
    assert!(!cache.set(Some("or2"), 1800).unwrap());
    assert!(cache.set(Some("va6"), 1800).unwrap());
}

#[test]
fn test_clearing_hint_reports_change_only_when_present() {
    let cache = LocationHintCache::open(kv(), &config());
    assert!(!cache.set(None, 0).unwrap());
    assert!(cache.set(Some("or2"), 1800).unwrap());
    assert!(cache.set(None, 0).unwrap());
    assert_eq!(cache.get().unwrap(), None);
}

#[test]
fn test_empty_hint_clears_like_none() {
    let store = kv();
    let ns = config().namespace;
    let cache = LocationHintCache::open(store.clone(), &config());
    assert!(cache.set(Some("or2"), 1800).unwrap());

    // Servers signal "no hint" with an empty string; it must never be
    // stored, or URLs would grow an empty path segment.
    assert!(cache.set(Some(""), 1800).unwrap());
    assert_eq!(cache.get().unwrap(), None);
    assert!(store.get_string(&ns, KEY_LOCATION_HINT).unwrap().is_none());

    // Clearing an already-clear cache reports no change.
    assert!(!cache.set(Some(""), 1800).unwrap());
}

#[test]
fn test_refreshing_expired_hint_counts_as_change() {
    let now = Utc::now();
    let cache = LocationHintCache::open(kv(), &config());
    cache.set_at(Some("or2"), 60, now).unwrap();

    // The old hint has lapsed, so re-announcing it is a change.
    let later = now + Duration::seconds(120);
    assert!(cache.set_at(Some("or2"), 1800, later).unwrap());
}

#[test]
fn test_expired_hint_reads_none_but_stays_persisted() {
    let now = Utc::now();
    let store = kv();
    let ns = config().namespace;
    let cache = LocationHintCache::open(store.clone(), &config());
    cache.set_at(Some("or2"), 60, now).unwrap();

    assert_eq!(cache.get_at(now + Duration::seconds(61)).unwrap(), None);
    assert_eq!(
        store.get_string(&ns, KEY_LOCATION_HINT).unwrap(),
        Some("or2".to_string())
    );
}

#[test]
fn test_hint_survives_reopen() {
    let now = Utc::now();
    let store = kv();
    {
        let cache = LocationHintCache::open(store.clone(), &config());
        cache.set_at(Some("or2"), 1800, now).unwrap();
    }

    let reopened = LocationHintCache::open(store, &config());
    assert_eq!(
        reopened.get_at(now + Duration::seconds(1)).unwrap(),
        Some("or2".to_string())
    );
    assert_eq!(reopened.get_at(now + Duration::seconds(1801)).unwrap(), None);
}

// ─── Reset watermark ───────────────────────────────────────

#[test]
fn test_watermark_absent_by_default() {
    let watermark = ResetWatermark::open(kv(), &config());
    assert_eq!(watermark.get().unwrap(), None);
}

#[test]
fn test_watermark_persists_across_reopen() {
    let at = Utc::now();
    let store = kv();
    {
        let watermark = ResetWatermark::open(store.clone(), &config());
        watermark.set(at).unwrap();
    }

    let reopened = ResetWatermark::open(store, &config());
    let loaded = reopened.get().unwrap().unwrap();
    // Persisted at millisecond precision.
    assert_eq!(loaded.timestamp_millis(), at.timestamp_millis());
}
