//! Object key layout and public URL construction

use crate::config::{StorageBackend, StorageConfig};

/// Every object the gateway writes lives under this prefix
pub const UPLOAD_PREFIX: &str = "uploads/";

/// Key for a freshly uploaded file: `uploads/<ms-epoch>_<filename>`
pub fn upload_key(timestamp_ms: i64, filename: &str) -> String {
    format!("{}{}_{}", UPLOAD_PREFIX, timestamp_ms, filename)
}

/// Key addressed by a client-supplied file name on delete/download
pub fn lookup_key(file_name: &str) -> String {
    format!("{}{}", UPLOAD_PREFIX, file_name)
}

/// Key as shown to clients when listing
pub fn display_name(key: &str) -> &str {
    key.strip_prefix(UPLOAD_PREFIX).unwrap_or(key)
}

/// Builds the public access URL for a stored key
#[derive(Debug, Clone)]
pub struct PublicUrlBuilder {
    base: String,
}

impl PublicUrlBuilder {
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    /// Base selection: explicit override, then custom endpoint (path-style),
    /// then the AWS virtual-hosted bucket address.
    pub fn from_config(config: &StorageConfig) -> Self {
        if let Some(base) = &config.public_base_url {
            return Self::new(base.as_str());
        }
        if config.backend == StorageBackend::Memory {
            return Self::new("memory://local");
        }
        match &config.endpoint {
            Some(endpoint) => Self::new(format!(
                "{}/{}",
                endpoint.trim_end_matches('/'),
                config.bucket
            )),
            None => Self::new(format!(
                "https://{}.s3.{}.amazonaws.com",
                config.bucket, config.region
            )),
        }
    }

    pub fn url_for(&self, key: &str) -> String {
        let path = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/{}", self.base, path)
    }
}
