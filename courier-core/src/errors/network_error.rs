//! Error types for the network transport.

/// Errors raised while exchanging requests with the edge network.
///
/// Exchange failures themselves never surface here: the transport folds
/// them into its outcome classification (retry vs. unrecoverable).
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// The HTTP client could not be constructed.
    #[error("http client build failed: {0}")]
    ClientBuild(String),
}
