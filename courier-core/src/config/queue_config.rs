use serde::{Deserialize, Serialize};

use super::defaults;

/// Durable-queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Retry interval in seconds applied when the server supplies none.
    pub default_retry_interval_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            default_retry_interval_secs: defaults::DEFAULT_RETRY_INTERVAL_SECS,
        }
    }
}
