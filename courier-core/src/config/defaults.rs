// Single source of truth for all default values.

// --- Network ---
pub const DEFAULT_DOMAIN: &str = "edge.courier-data.net";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_STREAMING_ENABLED: bool = true;
pub const DEFAULT_RECORD_SEPARATOR: &str = "\u{0}";
pub const DEFAULT_LINE_FEED: &str = "\n";
pub const PATH_PREFIX_PRODUCTION: &str = "/ee";
pub const PATH_PREFIX_PRE_PRODUCTION: &str = "/ee-pre-prd";
pub const INTERACT_PATH: &str = "/v1/interact";
pub const CONSENT_PATH: &str = "/v1/privacy/set-consent";

// --- Queue ---
pub const DEFAULT_RETRY_INTERVAL_SECS: u64 = 5;

// --- Store ---
pub const DEFAULT_STORE_NAMESPACE: &str = "EdgeDataStorage";
