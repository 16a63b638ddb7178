//! # courier-net
//!
//! The wire layer: request/response shapes for the Edge collection
//! endpoints, URL construction, streamed-response framing, and the blocking
//! HTTP transport with its recoverable-error classification.

pub mod protocol;
pub mod transport;

pub use protocol::request::{ConsentRequest, InteractRequest, RequestMeta, RequestXdm};
pub use protocol::response::{Handle, ResponseChunk, StorePayloadEntry};
pub use protocol::url::{build_url, validate_custom_path, RequestOperation};
pub use transport::client::{EdgeHttpClient, HttpClientConfig};
pub use transport::stream::StreamFraming;
pub use transport::{EdgeRequest, IEdgeTransport, ResponseListener, SendOutcome};
