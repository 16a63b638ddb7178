//! Configuration structs with serde defaults.

pub mod defaults;
mod network_config;
mod queue_config;
mod store_config;

pub use network_config::{EdgeEnvironment, NetworkConfig, StreamingConfig};
pub use queue_config::QueueConfig;
pub use store_config::StoreConfig;

use serde::{Deserialize, Serialize};

/// Aggregate configuration for the whole pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CourierConfig {
    pub network: NetworkConfig,
    pub queue: QueueConfig,
    pub store: StoreConfig,
}
