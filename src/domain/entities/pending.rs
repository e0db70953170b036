use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::value_objects::AccountEmail;

/// A write that could not reach the server, retained for replay.
///
/// Lifecycle: created when a server write fails for any reason, deleted only
/// after a confirmed server acknowledgment. At most one entry per account:
/// a newer write replaces the older one in place, by arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSyncEntry {
    pub email: AccountEmail,
    pub data_type: String,
    pub payload: Value,
    pub updated_at: DateTime<Utc>,
}

impl PendingSyncEntry {
    pub fn profile(email: AccountEmail, payload: Value) -> Self {
        Self {
            email,
            data_type: "profile".to_string(),
            payload,
            updated_at: Utc::now(),
        }
    }
}
