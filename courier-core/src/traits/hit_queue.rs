//! Durable hit queue and the processor it drives.

use std::sync::Arc;
use std::time::Duration;

use crate::hit::QueueEntry;

/// Verdict returned by the processor for one queue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitResult {
    /// Entry is finished; the queue must drop it.
    Done,
    /// Entry must stay at the head and be retried after the given delay.
    Retry { after: Duration },
}

/// Trait for the durable FIFO of pending hits.
///
/// The queue owns persistence and scheduling; it hands entries to an
/// [`IHitProcessor`] one at a time, in order, and never processes the next
/// entry before the current one reports [`HitResult::Done`].
pub trait IHitQueue: Send + Sync {
    /// Append an entry. Returns `false` when the queue rejected it.
    fn enqueue(&self, entry: QueueEntry) -> bool;

    /// Stop handing entries to the processor; enqueue still accepts.
    fn suspend(&self);

    /// Resume handing entries to the processor.
    fn resume(&self);

    /// Drop every queued entry without processing.
    fn clear(&self);

    /// Number of entries currently queued.
    fn count(&self) -> usize;
}

/// Trait for the component that turns queue entries into network requests.
pub trait IHitProcessor: Send + Sync {
    /// Delay the queue should wait before re-offering this entry.
    fn retry_interval(&self, entry: &QueueEntry) -> Duration;

    /// Process one entry to completion.
    fn process(&self, entry: &QueueEntry) -> HitResult;
}

impl<T: IHitQueue + ?Sized> IHitQueue for Arc<T> {
    fn enqueue(&self, entry: QueueEntry) -> bool {
        (**self).enqueue(entry)
    }

    fn suspend(&self) {
        (**self).suspend()
    }

    fn resume(&self) {
        (**self).resume()
    }

    fn clear(&self) {
        (**self).clear()
    }

    fn count(&self) -> usize {
        (**self).count()
    }
}

impl<T: IHitProcessor + ?Sized> IHitProcessor for Arc<T> {
    fn retry_interval(&self, entry: &QueueEntry) -> Duration {
        (**self).retry_interval(entry)
    }

    fn process(&self, entry: &QueueEntry) -> HitResult {
        (**self).process(entry)
    }
}
