//! Configuration loading
//!
//! Settings are resolved in priority order:
//! 1. Command-line arguments (highest priority)
//! 2. Environment variables (handled by clap `env` fallbacks in the binary)
//! 3. TOML config file
//! 4. Compiled defaults (fallback)
//!
//! A missing TOML file is not an error: defaults are used and the caller is
//! told via [`ConfigOrigin`] so it can warn once logging is up. A file that
//! exists but cannot be parsed is a configuration error.

use crate::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Directory name under the platform config dir
pub const CONFIG_DIR_NAME: &str = "habit-tracker";

/// Complete configuration file contents
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub sources: SourcesConfig,
    pub sheets: SheetsConfig,
    pub database: DatabaseConfig,
    pub calendar: CalendarConfig,
}

/// HTTP listener and browser-facing settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Dashboard URL, used for OAuth callback redirects
    pub frontend_url: String,
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            frontend_url: "http://localhost:3000".to_string(),
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Source selection
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Name of the adapter to use when a request names none
    pub default_source: Option<String>,
}

/// Spreadsheet CSV export adapter
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SheetsConfig {
    pub sheet_id: Option<String>,
    /// Timeout for the availability probe
    pub probe_timeout_secs: u64,
    /// Timeout for the full CSV download
    pub timeout_secs: u64,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            sheet_id: None,
            probe_timeout_secs: 10,
            timeout_secs: 30,
        }
    }
}

/// Managed PostgreSQL adapter
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection URL (postgres://...)
    pub url: Option<String>,
    pub table: String,
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            table: "habit_events".to_string(),
            acquire_timeout_secs: 5,
        }
    }
}

/// Calendar adapter
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    pub enabled: bool,
    /// OAuth client secrets file
    pub credentials_file: PathBuf,
    /// Stored access/refresh token file
    pub token_file: PathBuf,
    pub redirect_uri: String,
    pub timeout_secs: u64,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            credentials_file: PathBuf::from("google_calendar_credentials.json"),
            token_file: PathBuf::from("google_calendar_token.json"),
            redirect_uri: "http://localhost:8000/auth/google/callback".to_string(),
            timeout_secs: 15,
        }
    }
}

/// Where the loaded configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    /// Parsed from this file
    File(PathBuf),
    /// File not found; compiled defaults in use
    Missing(PathBuf),
    /// No platform config directory; compiled defaults in use
    NoConfigDir,
}

impl ConfigOrigin {
    pub fn is_defaults(&self) -> bool {
        !matches!(self, ConfigOrigin::File(_))
    }
}

impl fmt::Display for ConfigOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigOrigin::File(path) => write!(f, "{}", path.display()),
            ConfigOrigin::Missing(path) => write!(f, "defaults ({} not found)", path.display()),
            ConfigOrigin::NoConfigDir => write!(f, "defaults (no config directory)"),
        }
    }
}

/// Command-line and environment overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub sheet_id: Option<String>,
    pub database_url: Option<String>,
    pub database_table: Option<String>,
    pub default_source: Option<String>,
    pub log_level: Option<String>,
}

impl TomlConfig {
    /// Parse configuration text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load configuration from `path`, or from the default location when `None`
    ///
    /// Missing files fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<(Self, ConfigOrigin)> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) => p,
                None => return Ok((Self::default(), ConfigOrigin::NoConfigDir)),
            },
        };

        if !path.exists() {
            return Ok((Self::default(), ConfigOrigin::Missing(path)));
        }

        let text = std::fs::read_to_string(&path)?;
        let config = Self::from_toml_str(&text).map_err(|e| {
            Error::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        Ok((config, ConfigOrigin::File(path)))
    }

    /// Apply overrides; blank strings are treated as unset
    pub fn apply_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(host) = non_blank(overrides.host) {
            self.server.host = host;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(id) = non_blank(overrides.sheet_id) {
            self.sheets.sheet_id = Some(id);
        }
        if let Some(url) = non_blank(overrides.database_url) {
            self.database.url = Some(url);
        }
        if let Some(table) = non_blank(overrides.database_table) {
            self.database.table = table;
        }
        if let Some(name) = non_blank(overrides.default_source) {
            self.sources.default_source = Some(name);
        }
        if let Some(level) = non_blank(overrides.log_level) {
            self.logging.level = level;
        }
        self
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// `<config_dir>/habit-tracker/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join("config.toml"))
}
