//! Configuration management
//!
//! Loads configuration for the ShieldBlog server from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,
    /// Upload configuration
    #[serde(default)]
    pub upload: UploadConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin (for cookie-based auth)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Maximum pool connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_database_url() -> String {
    "data/shieldblog.db".to_string()
}

fn default_max_connections() -> u32 {
    20
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// MySQL
    Mysql,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Password for the built-in admin account.
    /// Hashed at startup; never compared in plaintext.
    #[serde(default = "default_admin_password")]
    pub admin_password: String,
    /// Hosted session lifetime in days
    #[serde(default = "default_session_ttl_days")]
    pub session_ttl_days: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_password: default_admin_password(),
            session_ttl_days: default_session_ttl_days(),
        }
    }
}

fn default_admin_password() -> String {
    "admin123".to_string()
}

fn default_session_ttl_days() -> i64 {
    7
}

/// Upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Upload directory path
    #[serde(default = "default_upload_path")]
    pub path: PathBuf,
    /// Maximum cover image size in bytes (default: 2MB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Allowed image MIME types
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            path: default_upload_path(),
            max_file_size: default_max_file_size(),
            allowed_types: default_allowed_types(),
        }
    }
}

fn default_upload_path() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_max_file_size() -> u64 {
    2 * 1024 * 1024 // 2MB
}

fn default_allowed_types() -> Vec<String> {
    vec![
        "image/jpeg".to_string(),
        "image/png".to_string(),
        "image/gif".to_string(),
        "image/webp".to_string(),
    ]
}

impl UploadConfig {
    /// Check if a MIME type is allowed
    pub fn is_type_allowed(&self, mime_type: &str) -> bool {
        self.allowed_types.iter().any(|t| t == mime_type)
    }

    /// Get file extension for a MIME type
    pub fn get_extension(&self, mime_type: &str) -> &'static str {
        match mime_type {
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            _ => "bin",
        }
    }
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file.
    ///
    /// A missing or empty file yields default configuration; an invalid file
    /// is an error with the parse location included.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides.
    ///
    /// Environment variables follow the pattern:
    /// - SHIELDBLOG_SERVER_HOST
    /// - SHIELDBLOG_SERVER_PORT
    /// - SHIELDBLOG_SERVER_CORS_ORIGIN
    /// - SHIELDBLOG_DATABASE_DRIVER
    /// - SHIELDBLOG_DATABASE_URL
    /// - SHIELDBLOG_DATABASE_MAX_CONNECTIONS
    /// - SHIELDBLOG_AUTH_ADMIN_PASSWORD
    /// - SHIELDBLOG_AUTH_SESSION_TTL_DAYS
    /// - SHIELDBLOG_UPLOAD_PATH
    /// - SHIELDBLOG_UPLOAD_MAX_FILE_SIZE
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("SHIELDBLOG_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("SHIELDBLOG_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("SHIELDBLOG_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        if let Ok(driver) = std::env::var("SHIELDBLOG_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(url) = std::env::var("SHIELDBLOG_DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(max) = std::env::var("SHIELDBLOG_DATABASE_MAX_CONNECTIONS") {
            if let Ok(max) = max.parse::<u32>() {
                self.database.max_connections = max;
            }
        }

        if let Ok(password) = std::env::var("SHIELDBLOG_AUTH_ADMIN_PASSWORD") {
            self.auth.admin_password = password;
        }
        if let Ok(ttl) = std::env::var("SHIELDBLOG_AUTH_SESSION_TTL_DAYS") {
            if let Ok(ttl) = ttl.parse::<i64>() {
                self.auth.session_ttl_days = ttl;
            }
        }

        if let Ok(path) = std::env::var("SHIELDBLOG_UPLOAD_PATH") {
            self.upload.path = PathBuf::from(path);
        }
        if let Ok(size) = std::env::var("SHIELDBLOG_UPLOAD_MAX_FILE_SIZE") {
            if let Ok(size) = size.parse::<u64>() {
                self.upload.max_file_size = size;
            }
        }
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared mutex for all config tests that modify environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        super::CONFIG_ENV_MUTEX
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let path = std::path::Path::new("nonexistent_config.yml");
        let config = Config::load(path).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.driver, DatabaseDriver::Sqlite);
        assert_eq!(config.auth.admin_password, "admin123");
        assert_eq!(config.auth.session_ttl_days, 7);
        assert_eq!(config.upload.max_file_size, 2 * 1024 * 1024);
    }

    #[test]
    fn test_load_empty_file_returns_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "   \n  ").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "server:\n  port: 9090\nauth:\n  session_ttl_days: 30\n"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.auth.session_ttl_days, 30);
        assert_eq!(config.auth.admin_password, "admin123");
    }

    #[test]
    fn test_load_invalid_yaml_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server: [not a map").unwrap();

        let result = Config::load(file.path());
        assert!(result.is_err());
        let message = result.unwrap_err().to_string();
        assert!(message.contains("Failed to parse config file"));
    }

    #[test]
    fn test_load_mysql_driver() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "database:\n  driver: mysql\n  url: mysql://root@localhost/blog\n"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.database.driver, DatabaseDriver::Mysql);
        assert_eq!(config.database.url, "mysql://root@localhost/blog");
    }

    #[test]
    fn test_env_overrides() {
        let _guard = lock_env();

        std::env::set_var("SHIELDBLOG_SERVER_PORT", "3001");
        std::env::set_var("SHIELDBLOG_DATABASE_URL", "custom.db");
        std::env::set_var("SHIELDBLOG_AUTH_ADMIN_PASSWORD", "s3cret");
        std::env::set_var("SHIELDBLOG_UPLOAD_MAX_FILE_SIZE", "1048576");

        let config =
            Config::load_with_env(std::path::Path::new("nonexistent_config.yml")).unwrap();

        std::env::remove_var("SHIELDBLOG_SERVER_PORT");
        std::env::remove_var("SHIELDBLOG_DATABASE_URL");
        std::env::remove_var("SHIELDBLOG_AUTH_ADMIN_PASSWORD");
        std::env::remove_var("SHIELDBLOG_UPLOAD_MAX_FILE_SIZE");

        assert_eq!(config.server.port, 3001);
        assert_eq!(config.database.url, "custom.db");
        assert_eq!(config.auth.admin_password, "s3cret");
        assert_eq!(config.upload.max_file_size, 1048576);
    }

    #[test]
    fn test_env_override_invalid_port_ignored() {
        let _guard = lock_env();

        std::env::set_var("SHIELDBLOG_SERVER_PORT", "not-a-port");
        let config =
            Config::load_with_env(std::path::Path::new("nonexistent_config.yml")).unwrap();
        std::env::remove_var("SHIELDBLOG_SERVER_PORT");

        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_env_override_invalid_driver_ignored() {
        let _guard = lock_env();

        std::env::set_var("SHIELDBLOG_DATABASE_DRIVER", "postgres");
        let config =
            Config::load_with_env(std::path::Path::new("nonexistent_config.yml")).unwrap();
        std::env::remove_var("SHIELDBLOG_DATABASE_DRIVER");

        assert_eq!(config.database.driver, DatabaseDriver::Sqlite);
    }

    #[test]
    fn test_upload_type_allowed() {
        let config = UploadConfig::default();
        assert!(config.is_type_allowed("image/png"));
        assert!(config.is_type_allowed("image/jpeg"));
        assert!(!config.is_type_allowed("application/pdf"));
        assert!(!config.is_type_allowed("image/svg+xml"));
    }

    #[test]
    fn test_upload_extension_mapping() {
        let config = UploadConfig::default();
        assert_eq!(config.get_extension("image/jpeg"), "jpg");
        assert_eq!(config.get_extension("image/webp"), "webp");
        assert_eq!(config.get_extension("application/octet-stream"), "bin");
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        #[test]
        fn prop_config_yaml_round_trip(
            port in 1u16..=65535,
            ttl in 1i64..=365,
            max_size in 1u64..=(16 * 1024 * 1024),
        ) {
            let mut config = Config::default();
            config.server.port = port;
            config.auth.session_ttl_days = ttl;
            config.upload.max_file_size = max_size;

            let yaml = serde_yaml::to_string(&config).unwrap();
            let parsed: Config = serde_yaml::from_str(&yaml).unwrap();

            prop_assert_eq!(parsed.server.port, port);
            prop_assert_eq!(parsed.auth.session_ttl_days, ttl);
            prop_assert_eq!(parsed.upload.max_file_size, max_size);
        }

        #[test]
        fn prop_port_env_override(port in 1u16..=65535) {
            let _guard = super::CONFIG_ENV_MUTEX
                .lock()
                .unwrap_or_else(|e| e.into_inner());

            std::env::set_var("SHIELDBLOG_SERVER_PORT", port.to_string());
            let config =
                Config::load_with_env(std::path::Path::new("nonexistent_config.yml")).unwrap();
            std::env::remove_var("SHIELDBLOG_SERVER_PORT");

            prop_assert_eq!(config.server.port, port);
        }
    }
}
