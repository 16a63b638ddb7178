use serde::{Deserialize, Serialize};

use super::defaults;

/// Persisted-state configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Key/value namespace all courier state is persisted under.
    pub namespace: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            namespace: defaults::DEFAULT_STORE_NAMESPACE.to_string(),
        }
    }
}
