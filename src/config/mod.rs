// dbvault/src/config/mod.rs
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_DB_HOST: &str = "localhost";
const DEFAULT_DB_PORT: u16 = 3306;
const DEFAULT_WORK_DIR: &str = "./backups";
const DEFAULT_LOG_DIR: &str = "./logs";

// Structs for deserializing config.json
#[derive(Debug, Clone, Deserialize)]
pub struct JsonDatabaseConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonS3StorageConfig {
    pub bucket_name: Option<String>,
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub endpoint_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawJsonConfig {
    pub database: Option<JsonDatabaseConfig>,
    pub s3_storage: Option<JsonS3StorageConfig>,
    pub work_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub dump_command: Option<Vec<String>>,
}

/// Secrets taken from the environment, applied over the file contents.
#[derive(Debug, Clone, Default)]
pub struct SecretOverrides {
    pub db_password: Option<String>,
    pub s3_secret_access_key: Option<String>,
}

impl SecretOverrides {
    pub fn from_env() -> Self {
        SecretOverrides {
            db_password: std::env::var("DB_PASSWORD").ok().filter(|s| !s.is_empty()),
            s3_secret_access_key: std::env::var("S3_SECRET_ACCESS_KEY")
                .ok()
                .filter(|s| !s.is_empty()),
        }
    }
}

// Application's internal configuration structs
#[derive(Clone)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub secret: String,
    pub database_selector: Option<String>,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .field("database_selector", &self.database_selector)
            .finish()
    }
}

#[derive(Clone)]
pub struct StorageTarget {
    pub endpoint_url: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub container_name: String,
}

impl fmt::Debug for StorageTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageTarget")
            .field("endpoint_url", &self.endpoint_url)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("container_name", &self.container_name)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub connection: ConnectionConfig,
    pub storage: StorageTarget,
    pub work_dir: PathBuf,
    pub log_dir: PathBuf,
    pub dump_command: Option<Vec<String>>,
}

impl AppConfig {
    pub fn load_from_json(config_path: &Path, overrides: &SecretOverrides) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;
        let raw_json_config: RawJsonConfig = serde_json::from_str(&config_content)
            .with_context(|| {
                format!(
                    "Failed to parse JSON from config file at {}",
                    config_path.display()
                )
            })?;
        Self::from_raw(raw_json_config, overrides)
    }

    pub fn from_raw(raw: RawJsonConfig, overrides: &SecretOverrides) -> Result<Self> {
        let db = raw
            .database
            .context("database section must be set in config.json")?;
        let connection = ConnectionConfig {
            host: non_empty(db.host).unwrap_or_else(|| DEFAULT_DB_HOST.to_string()),
            port: db.port.unwrap_or(DEFAULT_DB_PORT),
            username: non_empty(db.username)
                .context("database.username must be set in config.json")?,
            secret: overrides
                .db_password
                .clone()
                .or(db.password)
                .context("database.password must be set in config.json or DB_PASSWORD")?,
            database_selector: non_empty(db.database),
        };

        let s3 = raw
            .s3_storage
            .context("s3_storage section must be set in config.json")?;
        let storage = StorageTarget {
            endpoint_url: non_empty(s3.endpoint_url)
                .context("s3_storage.endpoint_url must be set in config.json")?,
            region: non_empty(s3.region).context("s3_storage.region must be set in config.json")?,
            access_key_id: non_empty(s3.access_key_id)
                .context("s3_storage.access_key_id must be set in config.json")?,
            secret_access_key: overrides
                .s3_secret_access_key
                .clone()
                .or_else(|| non_empty(s3.secret_access_key))
                .context(
                    "s3_storage.secret_access_key must be set in config.json or S3_SECRET_ACCESS_KEY",
                )?,
            container_name: non_empty(s3.bucket_name)
                .context("s3_storage.bucket_name must be set in config.json")?,
        };

        let dump_command = match raw.dump_command {
            Some(cmd) if cmd.is_empty() || cmd[0].trim().is_empty() => {
                anyhow::bail!("dump_command in config.json must name a program as its first element")
            }
            other => other,
        };

        Ok(AppConfig {
            connection,
            storage,
            work_dir: non_empty_path(raw.work_dir).unwrap_or_else(|| PathBuf::from(DEFAULT_WORK_DIR)),
            log_dir: non_empty_path(raw.log_dir).unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR)),
            dump_command,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn non_empty_path(value: Option<PathBuf>) -> Option<PathBuf> {
    value.filter(|p| !p.as_os_str().is_empty())
}
