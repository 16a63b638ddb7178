//! # courier-core
//!
//! Foundation crate for the courier delivery pipeline: the event and hit
//! models, error types, configuration, and the capability traits the host
//! application implements (key/value persistence, durable hit queue, event
//! sink). Nothing here talks to the network; see `courier-net` and
//! `courier-pipeline` for the moving parts.

pub mod config;
pub mod consent;
pub mod errors;
pub mod event;
pub mod hit;
pub mod telemetry;
pub mod traits;

pub use config::{CourierConfig, EdgeEnvironment, NetworkConfig, QueueConfig, StoreConfig};
pub use consent::ConsentStatus;
pub use errors::{CourierError, CourierResult};
pub use event::Event;
pub use hit::{Hit, QueueEntry, RequestContext};
pub use traits::{HitResult, IEventSink, IHitProcessor, IHitQueue, IKeyValueStore, ResultEvent};
