//! Error types for request payload assembly.

/// Errors raised while building an outbound request body.
///
/// All of these are terminal for the hit that triggered them: a payload that
/// cannot be built now will not build on retry either, so the processor
/// drops the entry.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    /// No datastream/configuration id was available for the request.
    #[error("missing configuration id")]
    MissingConfigId,

    /// An experience hit carried no events.
    #[error("event batch is empty")]
    EmptyBatch,

    /// A consent hit carried no consents payload.
    #[error("missing consents payload")]
    MissingConsents,

    /// The event's custom request path failed validation.
    #[error("invalid request path: {0}")]
    InvalidPath(String),

    /// The body or envelope could not be (de)serialized.
    #[error("serialization failed: {0}")]
    Serialization(String),
}
