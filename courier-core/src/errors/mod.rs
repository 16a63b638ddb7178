//! Error types shared across the courier crates.
//!
//! Each concern gets its own thiserror enum; `CourierError` aggregates them
//! so a single `CourierResult` alias flows through every crate boundary.

mod network_error;
mod payload_error;
mod queue_error;
mod store_error;

pub use network_error::NetworkError;
pub use payload_error::PayloadError;
pub use queue_error::QueueError;
pub use store_error::StoreError;

/// Top-level error for the courier workspace.
#[derive(Debug, thiserror::Error)]
pub enum CourierError {
    /// Transport / HTTP exchange failures.
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// Persisted cache failures.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Request payload assembly failures.
    #[error(transparent)]
    Payload(#[from] PayloadError),

    /// Durable queue failures.
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// A lock was poisoned or some other concurrency invariant broke.
    #[error("concurrency error: {0}")]
    ConcurrencyError(String),
}

/// Result alias used throughout the workspace.
pub type CourierResult<T> = Result<T, CourierError>;

impl CourierError {
    /// Build a `ConcurrencyError` from a poisoned-lock message.
    pub fn lock(context: &str) -> Self {
        CourierError::ConcurrencyError(format!("{context} lock poisoned"))
    }
}
