//! Configuration file
//!
//! Optional JSON file; every field has a default, so `{}` is a complete
//! configuration. Values are validated once after loading.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::archive::CompressionMethod;
use crate::container::{ExportOptions, ImportOptions, ReplayOptions};
use crate::observability::Severity;
use crate::remote::FetchOptions;

use super::errors::{CliError, CliResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Root of the download tree
    #[serde(default = "default_downloads_dir")]
    pub downloads_dir: PathBuf,

    /// Container file extension, without the dot
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Operations per log page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Delay between remote requests
    #[serde(default = "default_delay_ms")]
    pub request_delay_ms: u64,

    /// Operations per replay batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Delay between replay batches
    #[serde(default = "default_delay_ms")]
    pub batch_delay_ms: u64,

    /// Differing keys listed per state comparison
    #[serde(default = "default_max_reported_diffs")]
    pub max_reported_diffs: usize,

    /// HTTP timeout per request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// "deflate" or "stored"
    #[serde(default = "default_compression")]
    pub compression: String,

    /// Minimum log severity
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_downloads_dir() -> PathBuf {
    PathBuf::from("./downloads")
}
fn default_extension() -> String {
    "phd".to_string()
}
fn default_page_size() -> usize {
    100
}
fn default_delay_ms() -> u64 {
    300
}
fn default_batch_size() -> usize {
    50
}
fn default_max_reported_diffs() -> usize {
    5
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_compression() -> String {
    "deflate".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            downloads_dir: default_downloads_dir(),
            extension: default_extension(),
            page_size: default_page_size(),
            request_delay_ms: default_delay_ms(),
            batch_size: default_batch_size(),
            batch_delay_ms: default_delay_ms(),
            max_reported_diffs: default_max_reported_diffs(),
            request_timeout_secs: default_request_timeout_secs(),
            compression: default_compression(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CliError::config_error(format!("Failed to read config {}: {}", path.display(), e))
        })?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Load from `path` when given, otherwise use defaults
    pub fn load_or_default(path: Option<&Path>) -> CliResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> CliResult<()> {
        if self.page_size == 0 {
            return Err(CliError::config_error("page_size must be > 0"));
        }
        if self.batch_size == 0 {
            return Err(CliError::config_error("batch_size must be > 0"));
        }
        if self.request_timeout_secs == 0 {
            return Err(CliError::config_error("request_timeout_secs must be > 0"));
        }

        if self.extension.is_empty()
            || self
                .extension
                .chars()
                .any(|c| matches!(c, '/' | '\\' | '.') || c.is_control())
        {
            return Err(CliError::config_error(format!(
                "Invalid extension: '{}'",
                self.extension
            )));
        }

        self.compression_method()?;
        self.log_severity()?;

        Ok(())
    }

    pub fn compression_method(&self) -> CliResult<CompressionMethod> {
        CompressionMethod::from_name(&self.compression).ok_or_else(|| {
            CliError::config_error(format!(
                "Invalid compression: '{}'. Expected 'deflate' or 'stored'.",
                self.compression
            ))
        })
    }

    pub fn log_severity(&self) -> CliResult<Severity> {
        parse_severity(&self.log_level)
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            page_size: self.page_size,
            request_delay: self.request_delay(),
        }
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn export_options(&self) -> CliResult<ExportOptions> {
        Ok(ExportOptions {
            fetch: self.fetch_options(),
            method: self.compression_method()?,
            max_reported_diffs: self.max_reported_diffs,
        })
    }

    pub fn import_options(&self) -> ImportOptions {
        ImportOptions {
            replay: ReplayOptions {
                batch_size: self.batch_size,
                batch_delay: Duration::from_millis(self.batch_delay_ms),
            },
            settle_delay: self.request_delay(),
            max_reported_diffs: self.max_reported_diffs,
        }
    }
}

/// Parse a severity name as accepted by `--log-level`
pub fn parse_severity(name: &str) -> CliResult<Severity> {
    Severity::parse(name).ok_or_else(|| {
        CliError::config_error(format!(
            "Invalid log level: '{}'. Expected trace, info, warn, error, or fatal.",
            name
        ))
    })
}
