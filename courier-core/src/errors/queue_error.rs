//! Error types for durable queue interaction.

/// Errors raised when handing work to the durable queue.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The queue declined to persist the entry.
    #[error("queue rejected entry {0}")]
    Rejected(String),
}
