use serde::{Deserialize, Serialize};

/// Where the data in a [`SyncOutcome`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncSource {
    Server,
    Cache,
    Offline,
}

/// Structured result of every caller-facing sync operation.
///
/// Operations always return one of these rather than raising: a failure with
/// cached data is still useful to the UI, and only total unavailability of
/// both server and cache produces `success == false` with no data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncOutcome<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub source: SyncSource,
}

impl<T> SyncOutcome<T> {
    pub fn server(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            source: SyncSource::Server,
        }
    }

    pub fn cache(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            source: SyncSource::Cache,
        }
    }

    /// Server unreachable; whatever the local cache held, tagged offline.
    pub fn offline(data: Option<T>) -> Self {
        Self {
            success: data.is_some(),
            data,
            error: None,
            source: SyncSource::Offline,
        }
    }

    /// A guard (single-flight lock, cooldown, per-key interval) refused the
    /// attempt. Carries the last known cached value so callers never block.
    pub fn throttled(data: Option<T>) -> Self {
        Self {
            success: data.is_some(),
            data,
            error: Some("throttled".to_string()),
            source: SyncSource::Cache,
        }
    }

    /// Written durably to the local store and queued for replay; the server
    /// could not be reached right now.
    pub fn queued(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: Some("queued_for_retry".to_string()),
            source: SyncSource::Cache,
        }
    }

    pub fn failed(error: impl Into<String>, data: Option<T>, source: SyncSource) -> Self {
        Self {
            success: false,
            data,
            error: Some(error.into()),
            source,
        }
    }

    /// Neither the server nor the local cache could produce anything.
    pub fn no_data() -> Self {
        Self {
            success: false,
            data: None,
            error: Some("no_data_available".to_string()),
            source: SyncSource::Offline,
        }
    }

    pub fn is_throttled(&self) -> bool {
        self.error.as_deref() == Some("throttled")
    }
}
