//! Key names used in the host key/value store.
//!
//! The namespace itself comes from [`courier_core::config::StoreConfig`].

/// JSON map of active store payload entries.
pub const KEY_STORE_PAYLOADS: &str = "storePayloads";

/// Current Edge location hint.
pub const KEY_LOCATION_HINT: &str = "locationHint";

/// Expiry of the location hint, epoch milliseconds.
pub const KEY_LOCATION_HINT_EXPIRY: &str = "locationHintExpiryTimestamp";

/// Timestamp of the last identity reset, epoch milliseconds.
pub const KEY_RESET_IDENTITIES_DATE: &str = "resetIdentitiesDate";
