//! Error types for the persisted caches.

/// Errors raised by the store/location-hint caches and their persistence.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing key/value store rejected a read or write.
    #[error("persistence failed for '{key}': {reason}")]
    PersistFailed {
        /// The persisted key involved.
        key: String,
        /// Underlying storage error text.
        reason: String,
    },
}
