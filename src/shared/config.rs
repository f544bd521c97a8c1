use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub sync: SyncConfig,
    pub remote: RemoteConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub auto_sync: bool,
    /// Backstop drain interval while online.
    pub poll_interval_secs: u64,
    /// Upper bound for a single remote call; expiry counts as a network failure.
    pub request_timeout_secs: u64,
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_token: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: default_database_url(),
                max_connections: 5,
            },
            sync: SyncConfig::default(),
            remote: RemoteConfig {
                base_url: "http://localhost:3000/api".to_string(),
                api_token: None,
            },
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            auto_sync: true,
            poll_interval_secs: 30,
            request_timeout_secs: 30,
            max_attempts: 3,
            retry_backoff_ms: 0,
            max_backoff_ms: 5 * 60 * 1000,
        }
    }
}

impl SyncConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("FIELDSYNC_DATABASE_URL") {
            let v = v.trim();
            if !v.is_empty() {
                cfg.database.url = v.to_string();
            }
        }
        if let Ok(v) = std::env::var("FIELDSYNC_DB_MAX_CONNECTIONS")
            && let Some(value) = parse_u32(&v)
        {
            cfg.database.max_connections = value;
        }

        if let Ok(v) = std::env::var("FIELDSYNC_AUTO_SYNC") {
            cfg.sync.auto_sync = parse_bool(&v, cfg.sync.auto_sync);
        }
        if let Ok(v) = std::env::var("FIELDSYNC_POLL_INTERVAL_SECS")
            && let Some(value) = parse_u64(&v)
        {
            cfg.sync.poll_interval_secs = value;
        }
        if let Ok(v) = std::env::var("FIELDSYNC_REQUEST_TIMEOUT_SECS")
            && let Some(value) = parse_u64(&v)
        {
            cfg.sync.request_timeout_secs = value;
        }
        if let Ok(v) = std::env::var("FIELDSYNC_MAX_ATTEMPTS")
            && let Some(value) = parse_u32(&v)
        {
            cfg.sync.max_attempts = value;
        }
        if let Ok(v) = std::env::var("FIELDSYNC_RETRY_BACKOFF_MS")
            && let Some(value) = parse_u64(&v)
        {
            cfg.sync.retry_backoff_ms = value;
        }
        if let Ok(v) = std::env::var("FIELDSYNC_MAX_BACKOFF_MS")
            && let Some(value) = parse_u64(&v)
        {
            cfg.sync.max_backoff_ms = value;
        }

        if let Ok(v) = std::env::var("FIELDSYNC_API_BASE_URL") {
            let v = v.trim().trim_end_matches('/');
            if !v.is_empty() {
                cfg.remote.base_url = v.to_string();
            }
        }
        if let Ok(v) = std::env::var("FIELDSYNC_API_TOKEN") {
            let v = v.trim();
            cfg.remote.api_token = if v.is_empty() {
                None
            } else {
                Some(v.to_string())
            };
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }
        if self.sync.poll_interval_secs == 0 {
            return Err("Sync poll_interval_secs must be greater than 0".to_string());
        }
        if self.sync.request_timeout_secs == 0 {
            return Err("Sync request_timeout_secs must be greater than 0".to_string());
        }
        if self.sync.max_attempts == 0 {
            return Err("Sync max_attempts must be greater than 0".to_string());
        }
        if self.remote.base_url.trim().is_empty() {
            return Err("Remote base_url must not be empty".to_string());
        }
        Ok(())
    }
}

fn default_database_url() -> String {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("fieldsync");
    path.push("fieldsync.db");
    format!("sqlite://{}?mode=rwc", path.display())
}

fn parse_bool(s: &str, default: bool) -> bool {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}

fn parse_u32(value: &str) -> Option<u32> {
    value.trim().parse::<u32>().ok()
}
