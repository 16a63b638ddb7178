//! Capability traits implemented by the host application and the pipeline.

pub mod event_sink;
pub mod hit_queue;
pub mod key_value;

pub use event_sink::{IEventSink, ResultEvent};
pub use hit_queue::{HitResult, IHitProcessor, IHitQueue};
pub use key_value::IKeyValueStore;
