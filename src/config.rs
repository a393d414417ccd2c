//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::api;
use crate::portal::PortalSettings;
use crate::store::{DEFAULT_CHUNK_SIZE, MIN_PASSWORD_LENGTH};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub portal: PortalConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,

    #[serde(default)]
    pub secure_cookies: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8090
}

fn default_max_body_size() -> usize {
    50 * 1024 * 1024 // 50 MB
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_size: default_max_body_size(),
            secure_cookies: false,
        }
    }
}

impl From<&ApiConfig> for api::ApiConfig {
    fn from(config: &ApiConfig) -> Self {
        api::ApiConfig {
            host: config.host.clone(),
            port: config.port,
            max_body_size: config.max_body_size,
            secure_cookies: config.secure_cookies,
        }
    }
}

/// Blob storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root of the stored files
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Prefix of download URLs; defaults to the API address
    #[serde(default)]
    pub public_base_url: Option<String>,

    /// Write chunk between progress reports (bytes)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_data_dir() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("investor-portal").to_string_lossy().to_string())
        .unwrap_or_else(|| "./portal_data".to_string())
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            public_base_url: None,
            chunk_size: default_chunk_size(),
        }
    }
}

impl StorageConfig {
    /// Directory blobs are written to
    pub fn blob_root(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("blobs")
    }
}

/// Portal branding, form rules and the bootstrap administrator
#[derive(Debug, Clone, Deserialize)]
pub struct PortalConfig {
    #[serde(default = "default_company_name")]
    pub company_name: String,

    #[serde(default = "default_login_path")]
    pub login_path: String,

    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,

    /// Seeded as an administrator on startup when both are set
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

fn default_company_name() -> String {
    PortalSettings::default().company_name
}

fn default_login_path() -> String {
    PortalSettings::default().login_path
}

fn default_min_password_length() -> usize {
    MIN_PASSWORD_LENGTH
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            company_name: default_company_name(),
            login_path: default_login_path(),
            min_password_length: default_min_password_length(),
            admin_email: None,
            admin_password: None,
        }
    }
}

impl PortalConfig {
    pub fn settings(&self) -> PortalSettings {
        PortalSettings {
            company_name: self.company_name.clone(),
            login_path: self.login_path.clone(),
            min_password_length: self.min_password_length.max(MIN_PASSWORD_LENGTH),
        }
    }

    /// Bootstrap administrator credentials, if configured
    pub fn bootstrap_admin(&self) -> Option<(&str, &str)> {
        match (&self.admin_email, &self.admin_password) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                Some((email.as_str(), password.as_str()))
            }
            _ => None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("investor-portal").join("config.toml")),
            Some(PathBuf::from("/etc/investor-portal/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        // Fall back to environment-only config
        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Download URL prefix, falling back to the API address
    pub fn public_base_url(&self) -> String {
        self.storage.public_base_url.clone().unwrap_or_else(|| {
            let host = if self.api.host == "0.0.0.0" {
                "localhost"
            } else {
                self.api.host.as_str()
            };
            format!("http://{}:{}", host, self.api.port)
        })
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // API overrides
        if let Some(host) = var("PORTAL_API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = var("PORTAL_API_PORT").and_then(|p| p.parse().ok()) {
            self.api.port = port;
        }

        // Storage overrides
        if let Some(data_dir) = var("PORTAL_DATA_DIR") {
            self.storage.data_dir = data_dir;
        }
        if let Some(url) = var("PORTAL_PUBLIC_URL") {
            self.storage.public_base_url = Some(url);
        }

        // Portal overrides
        if let Some(name) = var("PORTAL_COMPANY_NAME") {
            self.portal.company_name = name;
        }
        if let Some(email) = var("PORTAL_ADMIN_EMAIL") {
            self.portal.admin_email = Some(email);
        }
        if let Some(password) = var("PORTAL_ADMIN_PASSWORD") {
            self.portal.admin_password = Some(password);
        }

        // Logging overrides
        if let Some(level) = var("PORTAL_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("PORTAL_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Investor Portal Configuration
#
# Environment variables override these settings:
# - PORTAL_API_HOST
# - PORTAL_API_PORT
# - PORTAL_DATA_DIR
# - PORTAL_PUBLIC_URL
# - PORTAL_COMPANY_NAME
# - PORTAL_ADMIN_EMAIL
# - PORTAL_ADMIN_PASSWORD
# - PORTAL_LOG_LEVEL
# - PORTAL_LOG_FORMAT

[api]
# API server host
host = "0.0.0.0"

# API server port
port = 8090

# Largest accepted request body, bounds uploads (bytes)
max_body_size = 52428800

# Mark the session cookie Secure (enable behind HTTPS)
secure_cookies = false

[storage]
# Directory for uploaded files
data_dir = "~/.local/share/investor-portal"

# Prefix of download URLs (defaults to http://{host}:{port})
# public_base_url = "https://portal.example.com"

# Bytes written between upload progress reports
chunk_size = 262144

[portal]
# Name shown on the public page, the dashboard and welcome messages
company_name = "Blackpine Capital"

# Where the Session Guard sends unauthenticated visitors
login_path = "/admin/login"

# Minimum investor password length
min_password_length = 6

# Administrator seeded on startup
# admin_email = "admin@example.com"
# admin_password = "change-me"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
