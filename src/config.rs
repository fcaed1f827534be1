//! Configuration management for the RAX file manager
//!
//! Loaded once at startup from built-in defaults, an optional `config.toml`
//! and `RAX_FM_*` environment variables, then passed explicitly to the
//! components that need it. Nothing here changes while the server runs.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_STORAGE_ROOT: &str = "./uploads";
/// 32 MiB
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 32 << 20;

/// Server configuration
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// IP address to bind the HTTP listener
    /// Environment: RAX_FM_BIND_ADDRESS
    pub bind_address: String,

    /// Environment: RAX_FM_PORT
    pub port: u16,

    /// Directory holding every stored file; created if absent
    /// Environment: RAX_FM_STORAGE_ROOT
    pub storage_root: String,

    /// Largest accepted upload in bytes
    /// Environment: RAX_FM_MAX_UPLOAD_SIZE
    pub max_upload_size: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            storage_root: DEFAULT_STORAGE_ROOT.to_string(),
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
        }
    }
}

impl ServerConfig {
    /// Load configuration from ./config.toml (if present) with environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from `file` (extension optional, file optional)
    pub fn load_from(file: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("bind_address", DEFAULT_BIND_ADDRESS)?
            .set_default("port", i64::from(DEFAULT_PORT))?
            .set_default("storage_root", DEFAULT_STORAGE_ROOT)?
            .set_default("max_upload_size", DEFAULT_MAX_UPLOAD_SIZE as i64)?
            .add_source(File::with_name(file).required(false))
            .add_source(
                Environment::with_prefix("RAX_FM")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Message("port cannot be 0".into()));
        }

        if self.storage_root.trim().is_empty() {
            return Err(ConfigError::Message("storage_root cannot be empty".into()));
        }

        if self.max_upload_size == 0 {
            return Err(ConfigError::Message(
                "max_upload_size must be greater than 0".into(),
            ));
        }

        if self.socket_addr().is_err() {
            return Err(ConfigError::Message(format!(
                "invalid bind_address: {}",
                self.bind_address
            )));
        }

        Ok(())
    }

    /// Bind address and port as a socket address
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.bind_address, self.port).parse()
    }

    pub fn storage_root_path(&self) -> PathBuf {
        PathBuf::from(&self.storage_root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent");
        let config = ServerConfig::load_from(path.to_str().unwrap()).unwrap();

        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.storage_root, DEFAULT_STORAGE_ROOT);
        assert_eq!(config.max_upload_size, 32 * 1024 * 1024);
    }

    #[test]
    fn test_toml_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "port = 9090\nstorage_root = \"/srv/files\"\nmax_upload_size = 1024").unwrap();

        let config = ServerConfig::load_from(path.to_str().unwrap()).unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.storage_root, "/srv/files");
        assert_eq!(config.max_upload_size, 1024);
        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = ServerConfig {
            port: 0,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ServerConfig {
            storage_root: "  ".into(),
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ServerConfig {
            max_upload_size: 0,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ServerConfig {
            bind_address: "not an ip".into(),
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());

        assert!(ServerConfig::default().validate().is_ok());
    }
}
