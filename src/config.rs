//! Configuration module for Sharebox.

use serde::Deserialize;
use std::path::Path;

use crate::share::{PermissionSet, TransferLimits};
use crate::{Result, ShareboxError};

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Shared directory configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ShareConfig {
    /// Directory exposed to clients. Created at startup if missing.
    #[serde(default = "default_share_path")]
    pub path: String,
    /// Entry names hidden from directory listings.
    #[serde(default)]
    pub excluded_files: Vec<String>,
}

fn default_share_path() -> String {
    "shared".to_string()
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            path: default_share_path(),
            excluded_files: vec![],
        }
    }
}

/// Per-operation permission toggles.
///
/// Read-only operations are enabled by default, anything that mutates the
/// share has to be switched on explicitly.
#[derive(Debug, Clone, Deserialize)]
pub struct PermissionsConfig {
    #[serde(default)]
    pub upload: bool,
    #[serde(default = "default_true")]
    pub download: bool,
    #[serde(default)]
    pub delete: bool,
    #[serde(default)]
    pub rename: bool,
    #[serde(default, rename = "move")]
    pub move_entries: bool,
    #[serde(default)]
    pub create_folder: bool,
    #[serde(default = "default_true")]
    pub preview: bool,
}

fn default_true() -> bool {
    true
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            upload: false,
            download: true,
            delete: false,
            rename: false,
            move_entries: false,
            create_folder: false,
            preview: true,
        }
    }
}

impl PermissionsConfig {
    /// Freeze the toggles into the permission set consulted by the gate.
    pub fn to_permission_set(&self) -> PermissionSet {
        PermissionSet {
            upload: self.upload,
            download: self.download,
            delete: self.delete,
            rename: self.rename,
            move_entries: self.move_entries,
            create_folder: self.create_folder,
            preview: self.preview,
        }
    }
}

/// Size limits.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum total upload size per request in bytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_bytes: u64,
    /// Maximum size for inline preview of non-text files in bytes.
    #[serde(default = "default_max_preview_size")]
    pub max_preview_size_bytes: u64,
    /// Maximum size for inline preview of text files in bytes.
    #[serde(default = "default_max_text_preview_size")]
    pub max_text_preview_size_bytes: u64,
}

fn default_max_upload_size() -> u64 {
    100 * 1024 * 1024 // 100MB
}

fn default_max_preview_size() -> u64 {
    5 * 1024 * 1024 // 5MB
}

fn default_max_text_preview_size() -> u64 {
    10 * 1024 * 1024 // 10MB
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_upload_size_bytes: default_max_upload_size(),
            max_preview_size_bytes: default_max_preview_size(),
            max_text_preview_size_bytes: default_max_text_preview_size(),
        }
    }
}

impl LimitsConfig {
    pub fn to_transfer_limits(&self) -> TransferLimits {
        TransferLimits {
            max_upload_size: self.max_upload_size_bytes,
            max_preview_size: self.max_preview_size_bytes,
            max_text_preview_size: self.max_text_preview_size_bytes,
        }
    }
}

/// Folder archive configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveConfig {
    /// Gzip compression level (0-9).
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,
}

fn default_compression_level() -> u32 {
    6
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            compression_level: default_compression_level(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/sharebox.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Web front-end configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Whether to serve static files.
    #[serde(default)]
    pub serve_static: bool,
    /// Path to static files directory.
    #[serde(default = "default_static_path")]
    pub static_path: String,
}

fn default_static_path() -> String {
    "public".to_string()
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            cors_origins: vec![],
            serve_static: false,
            static_path: default_static_path(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Shared directory configuration.
    #[serde(default)]
    pub share: ShareConfig,
    /// Permission toggles.
    #[serde(default)]
    pub permissions: PermissionsConfig,
    /// Size limits.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Folder archive configuration.
    #[serde(default)]
    pub archive: ArchiveConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Web front-end configuration.
    #[serde(default)]
    pub web: WebConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ShareboxError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| ShareboxError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `SHAREBOX_SHARE_PATH`: Override the shared directory
    /// - `SHAREBOX_PORT`: Override the listen port
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("SHAREBOX_SHARE_PATH") {
            if !path.is_empty() {
                self.share.path = path;
            }
        }

        if let Ok(port) = std::env::var("SHAREBOX_PORT") {
            match port.parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid SHAREBOX_PORT"),
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.share.path.trim().is_empty() {
            return Err(ShareboxError::Validation(
                "share.path must not be empty".to_string(),
            ));
        }
        if self.archive.compression_level > 9 {
            return Err(ShareboxError::Validation(format!(
                "archive.compression_level must be between 0 and 9 (got {})",
                self.archive.compression_level
            )));
        }
        if self.limits.max_upload_size_bytes == 0 {
            return Err(ShareboxError::Validation(
                "limits.max_upload_size_bytes must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
