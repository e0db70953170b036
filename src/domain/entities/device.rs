use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable per-install identifier.
///
/// Used to attribute writes and change notifications, never for conflict
/// resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceIdentity {
    pub id: String,
    pub platform: String,
    pub model: String,
    pub created_at: DateTime<Utc>,
}

impl DeviceIdentity {
    pub fn generate() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            platform: std::env::consts::OS.to_string(),
            model: std::env::var("MEMORA_DEVICE_MODEL").unwrap_or_else(|_| "unknown".to_string()),
            created_at: Utc::now(),
        }
    }
}
