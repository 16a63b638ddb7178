use serde::{Deserialize, Serialize};

use super::defaults;

/// Which edge environment requests are routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeEnvironment {
    Production,
    PreProduction,
}

impl EdgeEnvironment {
    /// The URL path prefix selecting this environment.
    pub fn path_prefix(&self) -> &'static str {
        match self {
            EdgeEnvironment::Production => defaults::PATH_PREFIX_PRODUCTION,
            EdgeEnvironment::PreProduction => defaults::PATH_PREFIX_PRE_PRODUCTION,
        }
    }
}

/// Streamed-response negotiation settings.
///
/// When enabled, requests advertise the separator pair and the transport
/// parses 200 responses as framed records instead of one JSON body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Whether streamed responses are requested at all.
    pub enabled: bool,
    /// Byte prefixed to every framed record.
    pub record_separator: String,
    /// Byte terminating every framed record.
    pub line_feed: String,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::DEFAULT_STREAMING_ENABLED,
            record_separator: defaults::DEFAULT_RECORD_SEPARATOR.to_string(),
            line_feed: defaults::DEFAULT_LINE_FEED.to_string(),
        }
    }
}

/// Network configuration for the edge endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Edge network domain requests are sent to.
    pub domain: String,
    /// Production vs. pre-production routing.
    pub environment: EdgeEnvironment,
    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
    /// Streamed-response settings.
    pub streaming: StreamingConfig,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            domain: defaults::DEFAULT_DOMAIN.to_string(),
            environment: EdgeEnvironment::Production,
            timeout_secs: defaults::DEFAULT_REQUEST_TIMEOUT_SECS,
            streaming: StreamingConfig::default(),
        }
    }
}
