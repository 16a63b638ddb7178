//! # courier-store
//!
//! Server-state caches for the delivery pipeline: the TTL-bounded store
//! payload cache, the location hint, and the identity-reset watermark.
//! All three mirror their state into the host's key/value store so it
//! survives restarts; the in-memory side is the source of truth while the
//! process runs.

pub mod keys;
pub mod location_hint;
pub mod store_cache;
pub mod watermark;

pub use location_hint::LocationHintCache;
pub use store_cache::{StoreCache, StoreEntry};
pub use watermark::ResetWatermark;
