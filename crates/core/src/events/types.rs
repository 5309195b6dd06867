use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Notifications about the client-side read cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CacheEvent {
    /// A key was dropped after a successful mutation; readers of it should refetch.
    #[serde(rename_all = "camelCase")]
    Invalidated {
        key: String,
        at: DateTime<Utc>,
    },
    /// The whole cache was dropped.
    Cleared,
}

impl CacheEvent {
    pub fn invalidated(key: impl Into<String>) -> Self {
        CacheEvent::Invalidated {
            key: key.into(),
            at: Utc::now(),
        }
    }

    /// Whether a reader holding `key` must refetch.
    pub fn affects(&self, key: &str) -> bool {
        match self {
            CacheEvent::Invalidated { key: k, .. } => k == key,
            CacheEvent::Cleared => true,
        }
    }
}
