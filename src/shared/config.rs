use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub network: NetworkConfig,
    pub sync: SyncConfig,
    pub storage: StorageConfig,
    pub remote: RemoteConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Upper bound for a single connectivity probe, in milliseconds.
    pub probe_timeout_ms: u64,
    /// Interval between background connectivity probes, in seconds.
    pub poll_interval: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub auto_sync: bool,
    pub sync_interval: u64,
    /// Upper bound for one upload request, in seconds.
    pub upload_timeout: u64,
    pub purge_synced_after_sync: bool,
    pub retain_synced_images: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub base_url: String,
    #[serde(default)]
    pub auth_token: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            database: DatabaseConfig {
                url: format!("sqlite:{}", data_dir.join("breedscan.db").display()),
                max_connections: 5,
                connection_timeout: 30,
            },
            network: NetworkConfig {
                probe_timeout_ms: 5_000,
                poll_interval: 15,
            },
            sync: SyncConfig {
                auto_sync: true,
                sync_interval: 300, // 5 minutes
                upload_timeout: 30,
                purge_synced_after_sync: false,
                retain_synced_images: false,
            },
            storage: StorageConfig { data_dir },
            remote: RemoteConfig {
                base_url: "http://localhost:3000".to_string(),
                auth_token: None,
            },
        }
    }
}

impl NetworkConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

impl SyncConfig {
    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout)
    }
}

impl StorageConfig {
    pub fn images_dir(&self) -> PathBuf {
        self.data_dir.join("images")
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("BREEDSCAN_DATA_DIR") {
            let dir = PathBuf::from(v.trim());
            cfg.database.url = format!("sqlite:{}", dir.join("breedscan.db").display());
            cfg.storage.data_dir = dir;
        }
        if let Ok(v) = std::env::var("BREEDSCAN_DATABASE_URL") {
            if !v.trim().is_empty() {
                cfg.database.url = v.trim().to_string();
            }
        }
        if let Ok(v) = std::env::var("BREEDSCAN_API_URL") {
            let url = v.trim().trim_end_matches('/');
            if !url.is_empty() {
                cfg.remote.base_url = url.to_string();
            }
        }
        if let Ok(v) = std::env::var("BREEDSCAN_API_TOKEN") {
            cfg.remote.auth_token = Some(v.trim().to_string()).filter(|t| !t.is_empty());
        }

        if let Some(value) = env_u64("BREEDSCAN_PROBE_TIMEOUT_MS") {
            cfg.network.probe_timeout_ms = value.max(1);
        }
        if let Some(value) = env_u64("BREEDSCAN_POLL_INTERVAL_SECS") {
            cfg.network.poll_interval = value.max(1);
        }

        if let Ok(v) = std::env::var("BREEDSCAN_AUTO_SYNC") {
            cfg.sync.auto_sync = parse_bool(&v, cfg.sync.auto_sync);
        }
        if let Some(value) = env_u64("BREEDSCAN_SYNC_INTERVAL_SECS") {
            cfg.sync.sync_interval = value.max(1);
        }
        if let Some(value) = env_u64("BREEDSCAN_UPLOAD_TIMEOUT_SECS") {
            cfg.sync.upload_timeout = value.max(1);
        }
        if let Ok(v) = std::env::var("BREEDSCAN_PURGE_SYNCED") {
            cfg.sync.purge_synced_after_sync = parse_bool(&v, cfg.sync.purge_synced_after_sync);
        }
        if let Ok(v) = std::env::var("BREEDSCAN_RETAIN_SYNCED_IMAGES") {
            cfg.sync.retain_synced_images = parse_bool(&v, cfg.sync.retain_synced_images);
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }
        if self.network.probe_timeout_ms == 0 {
            return Err("Network probe_timeout_ms must be greater than 0".to_string());
        }
        if self.network.poll_interval == 0 {
            return Err("Network poll_interval must be greater than 0".to_string());
        }
        if self.sync.upload_timeout == 0 {
            return Err("Sync upload_timeout must be greater than 0".to_string());
        }
        if self.sync.auto_sync && self.sync.sync_interval == 0 {
            return Err("Sync sync_interval must be greater than 0".to_string());
        }
        if !(self.remote.base_url.starts_with("http://")
            || self.remote.base_url.starts_with("https://"))
        {
            return Err(format!(
                "Remote base_url must be an http(s) URL: {}",
                self.remote.base_url
            ));
        }
        Ok(())
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("breedscan"))
        .unwrap_or_else(|| PathBuf::from("./data"))
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| parse_u64(&v))
}

fn parse_bool(s: &str, default: bool) -> bool {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
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
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.sync.upload_timeout(), Duration::from_secs(30));
        assert!(cfg.database.url.starts_with("sqlite:"));
        assert!(cfg.storage.images_dir().ends_with("images"));
    }

    #[test]
    fn test_validate_rejects_zero_timeouts_and_bad_url() {
        let mut cfg = AppConfig::default();
        cfg.sync.upload_timeout = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.network.probe_timeout_ms = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.remote.base_url = "ftp://example.com".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_parse_helpers() {
        assert!(parse_bool("YES", false));
        assert!(!parse_bool("off", true));
        assert!(parse_bool("maybe", true));
        assert_eq!(parse_u64(" 42 "), Some(42));
        assert_eq!(parse_u64("-1"), None);
    }
}
