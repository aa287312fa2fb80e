//! Configuration for the File Gateway
//!
//! Everything is read from environment variables (a `.env` file is honored).
//! There is no configuration file and no persisted local state.

use anyhow::{bail, Context, Result};
use shared::observability::{LogConfig, LogFormat, LogLevel};

/// Main configuration structure
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub logging: LogConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            server: ServerConfig::from_lookup(&lookup)?,
            storage: StorageConfig::from_lookup(&lookup)?,
            logging: logging_from_lookup(&lookup)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.server.validate()?;
        self.storage.validate()?;
        Ok(())
    }
}

const BYTES_PER_MB: usize = 1024 * 1024;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_size_mb: usize,
}

impl ServerConfig {
    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: lookup("PORT")
                .unwrap_or_else(|| "5000".to_string())
                .parse()
                .context("Invalid PORT")?,
            max_upload_size_mb: lookup("MAX_UPLOAD_SIZE_MB")
                .unwrap_or_else(|| "100".to_string())
                .parse()
                .context("Invalid MAX_UPLOAD_SIZE_MB")?,
        })
    }

    /// Upload cap in bytes. Saturates; `validate` rejects sizes that overflow.
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_size_mb.saturating_mul(BYTES_PER_MB)
    }

    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            bail!("Server port cannot be 0");
        }
        if self.max_upload_size_mb == 0 {
            bail!("MAX_UPLOAD_SIZE_MB must be at least 1");
        }
        if self.max_upload_size_mb.checked_mul(BYTES_PER_MB).is_none() {
            bail!(
                "MAX_UPLOAD_SIZE_MB is too large: {}",
                self.max_upload_size_mb
            );
        }
        Ok(())
    }
}

/// Which object store implementation backs the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    S3,
    /// Process-local store, for development and tests
    Memory,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::S3 => "s3",
            StorageBackend::Memory => "memory",
        }
    }
}

impl std::str::FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s3" => Ok(StorageBackend::S3),
            "memory" => Ok(StorageBackend::Memory),
            other => bail!("Unknown storage backend: {}", other),
        }
    }
}

/// Object storage configuration (S3 / MinIO)
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub region: String,
    pub bucket: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub endpoint: Option<String>,
    pub force_path_style: bool,
    pub public_base_url: Option<String>,
}

impl StorageConfig {
    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let endpoint = non_empty("S3_ENDPOINT");
        let force_path_style = match non_empty("S3_FORCE_PATH_STYLE") {
            Some(value) => value.parse().context("Invalid S3_FORCE_PATH_STYLE")?,
            None => endpoint.is_some(),
        };

        Ok(Self {
            backend: non_empty("STORAGE_BACKEND")
                .unwrap_or_else(|| "s3".to_string())
                .parse()
                .context("Invalid STORAGE_BACKEND")?,
            region: non_empty("AWS_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            bucket: non_empty("AWS_BUCKET_NAME").unwrap_or_default(),
            access_key_id: non_empty("AWS_ACCESS_KEY_ID"),
            secret_access_key: non_empty("AWS_SECRET_ACCESS_KEY"),
            endpoint,
            force_path_style,
            public_base_url: non_empty("PUBLIC_BASE_URL"),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.backend != StorageBackend::S3 {
            return Ok(());
        }
        if self.bucket.is_empty() {
            bail!("AWS_BUCKET_NAME is required for the s3 storage backend");
        }
        if self.access_key_id.is_some() != self.secret_access_key.is_some() {
            bail!("AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY must be set together");
        }
        Ok(())
    }
}

fn logging_from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<LogConfig> {
    let level: LogLevel = lookup("LOG_LEVEL")
        .unwrap_or_else(|| "info".to_string())
        .parse()
        .context("Invalid LOG_LEVEL")?;
    let format: LogFormat = lookup("LOG_FORMAT")
        .unwrap_or_else(|| "pretty".to_string())
        .parse()
        .context("Invalid LOG_FORMAT")?;

    Ok(LogConfig {
        level,
        format,
        service_name: "file-gateway".to_string(),
        include_line_numbers: format != LogFormat::Json,
    })
}
