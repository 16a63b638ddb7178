//! Request URL construction for the Edge collection endpoints.

use courier_core::config::{defaults, NetworkConfig};
use courier_core::errors::{CourierResult, PayloadError};

/// Which collection endpoint a request targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOperation {
    /// Experience event batches.
    Interact,
    /// Consent updates.
    Consent,
    /// Host-supplied path for non-standard deployments. Must be validated
    /// with [`validate_custom_path`] before it reaches the queue.
    Custom(String),
}

impl RequestOperation {
    pub fn path(&self) -> &str {
        match self {
            RequestOperation::Interact => defaults::INTERACT_PATH,
            RequestOperation::Consent => defaults::CONSENT_PATH,
            RequestOperation::Custom(path) => path,
        }
    }
}

/// Validate a host-supplied request path: non-empty, leading `/`, no empty
/// segments.
pub fn validate_custom_path(path: &str) -> CourierResult<()> {
    if path.is_empty() || !path.starts_with('/') || path.contains("//") {
        return Err(PayloadError::InvalidPath(path.to_string()).into());
    }
    Ok(())
}

/// Build the full URL for one send attempt.
///
/// `https://{domain}{env prefix}[/{location hint}]{operation path}` plus the
/// `configId` and `requestId` query pair.
pub fn build_url(
    config: &NetworkConfig,
    operation: &RequestOperation,
    location_hint: Option<&str>,
    config_id: &str,
    request_id: &str,
) -> String {
    let hint = location_hint
        .map(|h| format!("/{h}"))
        .unwrap_or_default();
    format!(
        "https://{}{}{}{}?configId={}&requestId={}",
        config.domain,
        config.environment.path_prefix(),
        hint,
        operation.path(),
        config_id,
        request_id
    )
}
