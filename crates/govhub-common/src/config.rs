//! Configuration schema and loading
//!
//! The pipeline consumes one JSON document with `data_sources`,
//! `download_settings`, `file_settings` and `integration_settings` sections.
//! A missing required section or a source without its `urls` list is a
//! [`GovError::Config`] and aborts before any network activity.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{GovError, Result};
use crate::types::SourceSpec;

// ============================================================================
// Download Setting Defaults
// ============================================================================

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default streaming chunk size in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Default retryable-attempt budget per request.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default constant delay between retry attempts, in seconds.
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 5;

/// Default politeness delay between pages and endpoint attempts, in seconds.
pub const DEFAULT_RATE_LIMIT_DELAY_SECS: u64 = 1;

/// Default upper bound on pages collected from a paginated API.
pub const DEFAULT_MAX_PAGES: u32 = 50;

/// Default page size requested from a paginated API.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Top-level configuration document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub data_sources: BTreeMap<String, SourceSpec>,
    pub download_settings: DownloadSettings,
    pub file_settings: FileSettings,
    #[serde(default)]
    pub integration_settings: IntegrationSettings,
}

/// Download behavior settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadSettings {
    #[serde(rename = "timeout", default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(rename = "retry_delay", default = "default_retry_delay")]
    pub retry_delay_secs: u64,
    #[serde(rename = "rate_limit_delay", default = "default_rate_limit_delay")]
    pub rate_limit_delay_secs: u64,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}
fn default_retry_delay() -> u64 {
    DEFAULT_RETRY_DELAY_SECS
}
fn default_rate_limit_delay() -> u64 {
    DEFAULT_RATE_LIMIT_DELAY_SECS
}
fn default_max_pages() -> u32 {
    DEFAULT_MAX_PAGES
}
fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_secs: DEFAULT_RETRY_DELAY_SECS,
            rate_limit_delay_secs: DEFAULT_RATE_LIMIT_DELAY_SECS,
            max_pages: DEFAULT_MAX_PAGES,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl DownloadSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn rate_limit_delay(&self) -> Duration {
        Duration::from_secs(self.rate_limit_delay_secs)
    }
}

/// Filesystem layout settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSettings {
    pub raw_data_dir: PathBuf,
    #[serde(default = "default_processed_dir")]
    pub processed_data_dir: PathBuf,
    pub temp_dir: PathBuf,
}

fn default_processed_dir() -> PathBuf {
    PathBuf::from("data/processed")
}

impl FileSettings {
    /// Create the raw, processed and temp directories if absent.
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.raw_data_dir)?;
        std::fs::create_dir_all(&self.processed_data_dir)?;
        std::fs::create_dir_all(&self.temp_dir)?;
        Ok(())
    }
}

/// Record-linkage settings: which source is primary and which column each
/// secondary source joins on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationSettings {
    pub primary_source: String,
    pub primary_key: String,
    pub secondary_keys: BTreeMap<String, String>,
}

impl Default for IntegrationSettings {
    fn default() -> Self {
        let mut secondary_keys = BTreeMap::new();
        secondary_keys.insert("compras".to_string(), "uasg".to_string());
        secondary_keys.insert("transferegov".to_string(), "codigo_siafi".to_string());
        Self {
            primary_source: "siafi".to_string(),
            primary_key: "codigo_ug".to_string(),
            secondary_keys,
        }
    }
}

impl AppConfig {
    /// Load and validate a configuration document from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            GovError::Config(format!(
                "configuration file not readable: {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: AppConfig = serde_json::from_str(&raw)
            .map_err(|e| GovError::Config(format!("invalid configuration document: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration invariants.
    ///
    /// Fails fast, before any network activity, on a missing or malformed
    /// section.
    pub fn validate(&self) -> Result<()> {
        if self.data_sources.is_empty() {
            return Err(GovError::Config(
                "data_sources section is empty".to_string(),
            ));
        }
        for (name, source) in &self.data_sources {
            if source.urls.is_empty() {
                return Err(GovError::Config(format!(
                    "source '{}' has no urls configured",
                    name
                )));
            }
        }
        if self.download_settings.timeout_secs == 0 {
            return Err(GovError::Config("timeout must be greater than 0".to_string()));
        }
        if self.download_settings.max_retries == 0 {
            return Err(GovError::Config(
                "max_retries must be at least 1".to_string(),
            ));
        }
        if self.download_settings.chunk_size == 0 {
            return Err(GovError::Config(
                "chunk_size must be greater than 0".to_string(),
            ));
        }
        if self.download_settings.page_size == 0 {
            return Err(GovError::Config(
                "page_size must be greater than 0".to_string(),
            ));
        }
        if self.file_settings.raw_data_dir.as_os_str().is_empty() {
            return Err(GovError::Config("raw_data_dir cannot be empty".to_string()));
        }
        if self.file_settings.temp_dir.as_os_str().is_empty() {
            return Err(GovError::Config("temp_dir cannot be empty".to_string()));
        }
        Ok(())
    }
}
