//! Collect-consent state.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tri-state collect consent driving the delivery queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentStatus {
    /// Collection allowed; queued hits flow.
    Yes,
    /// Collection denied; queued hits are dropped.
    No,
    /// Awaiting a decision; queued hits wait.
    Pending,
}

impl ConsentStatus {
    /// Map a collect-consent value string ("y"/"n") to a status.
    /// Anything unrecognized is treated as pending.
    pub fn from_collect_value(value: &str) -> Self {
        match value {
            "y" => ConsentStatus::Yes,
            "n" => ConsentStatus::No,
            _ => ConsentStatus::Pending,
        }
    }

    /// Extract the collect consent from a consent-preferences payload of the
    /// shape `{"consents": {"collect": {"val": "y"}}}`.
    /// Missing or malformed structure yields `Pending`.
    pub fn from_preferences(preferences: &Value) -> Self {
        preferences
            .get("consents")
            .and_then(|consents| consents.get("collect"))
            .and_then(|collect| collect.get("val"))
            .and_then(Value::as_str)
            .map(Self::from_collect_value)
            .unwrap_or(ConsentStatus::Pending)
    }
}
