//! # courier-pipeline
//!
//! The delivery pipeline proper: request assembly, the hit processor driven
//! by the durable queue, consent gating, positional response
//! demultiplexing, and the [`EdgeEngine`] facade the host embeds.

pub mod assembler;
pub mod callbacks;
pub mod consent_gate;
pub mod demux;
pub mod engine;
pub mod processor;

pub use assembler::{AssembledRequest, RequestAssembler};
pub use callbacks::{CallbackRegistry, CompletionCallback};
pub use consent_gate::ConsentGate;
pub use demux::ResponseDemultiplexer;
pub use engine::EdgeEngine;
pub use processor::EdgeHitProcessor;
