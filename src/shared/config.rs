use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub sync: SyncConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub base_url: String,
    /// Connectivity probe timeout. Short: a probe that hangs is as good as
    /// an unreachable server.
    pub probe_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Timeout for payloads that carry a profile image blob.
    pub image_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Minimum seconds between any two full syncs, regardless of key.
    pub cooldown_secs: u64,
    /// Minimum seconds between two sync attempts for the same account.
    pub per_key_min_interval_secs: u64,
    /// How old a caregiver sync may be before a patient is considered stale.
    pub staleness_window_secs: u64,
    /// Pending queue size past which a warning is logged on every enqueue.
    pub pending_soft_cap: u64,
    /// TTL for the in-memory profile cache.
    pub cache_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .map(|d| d.join("memora").display().to_string())
            .unwrap_or_else(|| "./data".to_string());

        Self {
            database: DatabaseConfig {
                url: format!("sqlite://{data_dir}/memora.db?mode=rwc"),
                max_connections: 5,
                connection_timeout: 30,
            },
            server: ServerConfig {
                base_url: "https://api.memora.app".to_string(),
                probe_timeout_secs: 3,
                request_timeout_secs: 10,
                image_timeout_secs: 30,
            },
            sync: SyncConfig {
                cooldown_secs: 5,
                per_key_min_interval_secs: 30,
                staleness_window_secs: 900, // 15 minutes
                pending_soft_cap: 500,
                cache_ttl_secs: 600,
            },
            storage: StorageConfig { data_dir },
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("MEMORA_SERVER_URL") {
            if !v.trim().is_empty() {
                cfg.server.base_url = v.trim().trim_end_matches('/').to_string();
            }
        }
        if let Ok(v) = std::env::var("MEMORA_DATA_DIR") {
            if !v.trim().is_empty() {
                cfg.storage.data_dir = v.trim().to_string();
                cfg.database.url = format!("sqlite://{}/memora.db?mode=rwc", cfg.storage.data_dir);
            }
        }
        if let Ok(v) = std::env::var("MEMORA_DATABASE_URL") {
            if !v.trim().is_empty() {
                cfg.database.url = v.trim().to_string();
            }
        }
        if let Ok(v) = std::env::var("MEMORA_SYNC_COOLDOWN_SECS") {
            if let Some(value) = parse_u64(&v) {
                cfg.sync.cooldown_secs = value;
            }
        }
        if let Ok(v) = std::env::var("MEMORA_SYNC_MIN_INTERVAL_SECS") {
            if let Some(value) = parse_u64(&v) {
                cfg.sync.per_key_min_interval_secs = value;
            }
        }
        if let Ok(v) = std::env::var("MEMORA_STALENESS_WINDOW_SECS") {
            if let Some(value) = parse_u64(&v) {
                cfg.sync.staleness_window_secs = value.max(1);
            }
        }
        if let Ok(v) = std::env::var("MEMORA_PROBE_TIMEOUT_SECS") {
            if let Some(value) = parse_u64(&v) {
                cfg.server.probe_timeout_secs = value.max(1);
            }
        }
        if let Ok(v) = std::env::var("MEMORA_REQUEST_TIMEOUT_SECS") {
            if let Some(value) = parse_u64(&v) {
                cfg.server.request_timeout_secs = value.max(1);
            }
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }
        if self.server.base_url.trim().is_empty() {
            return Err("Server base_url must not be empty".to_string());
        }
        if self.sync.staleness_window_secs == 0 {
            return Err("Sync staleness_window_secs must be greater than 0".to_string());
        }
        if self.server.probe_timeout_secs > self.server.request_timeout_secs {
            return Err(
                "Server probe_timeout_secs must not exceed request_timeout_secs".to_string(),
            );
        }
        Ok(())
    }
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_staleness_window() {
        let mut cfg = AppConfig::default();
        cfg.sync.staleness_window_secs = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_probe_slower_than_request() {
        let mut cfg = AppConfig::default();
        cfg.server.probe_timeout_secs = 60;
        assert!(cfg.validate().is_err());
    }
}
