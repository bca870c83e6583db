use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use crate::domain::{batch::MAX_RECORDS_PER_BATCH, error::IngestionError};

pub const CONFIG_PATH_ENV: &str = "CSV_INGESTION_CONFIG";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ingestion: IngestionConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_upload_limit")]
    pub upload_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            upload_limit_bytes: default_upload_limit(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestionConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Rows echoed back by the validate endpoint.
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout_secs: default_timeout_secs(),
            batch_size: default_batch_size(),
            preview_rows: default_preview_rows(),
        }
    }
}

impl IngestionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_upload_limit() -> usize {
    50 * 1024 * 1024
}

fn default_api_url() -> String {
    "http://localhost:9000/receive-table-data".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_batch_size() -> usize {
    MAX_RECORDS_PER_BATCH
}

fn default_preview_rows() -> usize {
    10
}

impl AppConfig {
    /// Defaults, then the YAML file named by `CSV_INGESTION_CONFIG`, then environment overrides.
    pub fn load() -> Result<Self, IngestionError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => {
                info!("Loading configuration from {}", path);
                let raw = std::fs::read_to_string(&path)
                    .map_err(|e| IngestionError::Config(format!("{path}: {e}")))?;
                Self::from_yaml(&raw)?
            }
            Err(_) => {
                debug!("{} not set, using default configuration", CONFIG_PATH_ENV);
                Self::default()
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, IngestionError> {
        serde_yaml::from_str(raw).map_err(|e| IngestionError::Config(e.to_string()))
    }

    /// Applies `INGESTION_*` and `SERVER_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), IngestionError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("INGESTION_API_URL") {
            self.ingestion.api_url = url;
        }
        if let Some(v) = lookup("INGESTION_TIMEOUT_SECS") {
            self.ingestion.timeout_secs = parse_var("INGESTION_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("INGESTION_BATCH_SIZE") {
            self.ingestion.batch_size = parse_var("INGESTION_BATCH_SIZE", &v)?;
        }
        if let Some(v) = lookup("INGESTION_PREVIEW_ROWS") {
            self.ingestion.preview_rows = parse_var("INGESTION_PREVIEW_ROWS", &v)?;
        }
        if let Some(host) = lookup("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(v) = lookup("SERVER_PORT") {
            self.server.port = parse_var("SERVER_PORT", &v)?;
        }
        if let Some(v) = lookup("SERVER_UPLOAD_LIMIT_BYTES") {
            self.server.upload_limit_bytes = parse_var("SERVER_UPLOAD_LIMIT_BYTES", &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), IngestionError> {
        let url = self.ingestion.api_url.trim();
        if url.is_empty() {
            return Err(IngestionError::Config("ingestion.api_url must be set".to_string()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(IngestionError::Config(format!(
                "ingestion.api_url must be an http(s) URL, got '{url}'"
            )));
        }
        if self.ingestion.batch_size == 0 {
            return Err(IngestionError::Config("ingestion.batch_size must be positive".to_string()));
        }
        if self.ingestion.timeout_secs == 0 {
            return Err(IngestionError::Config("ingestion.timeout_secs must be positive".to_string()));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, IngestionError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| IngestionError::Config(format!("{key}='{value}': {e}")))
}
