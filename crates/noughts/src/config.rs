//! Configuration management for the noughts server.
//!
//! This module handles loading, validation, and conversion of server configuration
//! from TOML files and command-line arguments.

use game_server::{SecurityConfig, ServerConfig};
use noughts_core::LobbyConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use tracing::info;

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Application configuration loaded from TOML file.
///
/// Every section may be omitted; missing sections and fields take their
/// defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration settings
    #[serde(default)]
    pub server: ServerSettings,
    /// Inbound message limits
    #[serde(default)]
    pub security: SecuritySettings,
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Network binding, admission and lobby behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Network address to bind the server to (e.g., "127.0.0.1:8080")
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Maximum number of concurrent client connections
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Maximum concurrent connections from a single IP address
    #[serde(default = "default_max_connections_per_ip")]
    pub max_connections_per_ip: usize,
    /// Seconds a new connection has to send its hello
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,
    /// Start matches as soon as a room fills
    #[serde(default)]
    pub auto_start: bool,
    /// Token for the `admin/clear` intent; absent disables it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_token: Option<String>,
}

/// Limits checked on every frame before it is parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecuritySettings {
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    #[serde(default = "default_max_json_depth")]
    pub max_json_depth: usize,
    #[serde(default = "default_max_string_length")]
    pub max_string_length: usize,
    #[serde(default = "default_max_collection_size")]
    pub max_collection_size: usize,
    /// Frames buffered per client before a slow reader is disconnected
    #[serde(default = "default_max_outbound_queue")]
    pub max_outbound_queue: usize,
}

/// Logging system configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
    /// Optional file path for log output (None means stdout only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

fn default_bind_address() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_max_connections() -> usize {
    1000
}

fn default_max_connections_per_ip() -> usize {
    10
}

fn default_connection_timeout() -> u64 {
    60
}

fn default_max_message_size() -> usize {
    SecurityConfig::default().max_message_size
}

fn default_max_json_depth() -> usize {
    SecurityConfig::default().max_json_depth
}

fn default_max_string_length() -> usize {
    SecurityConfig::default().max_string_length
}

fn default_max_collection_size() -> usize {
    SecurityConfig::default().max_collection_size
}

fn default_max_outbound_queue() -> usize {
    SecurityConfig::default().max_outbound_queue
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            max_connections: default_max_connections(),
            max_connections_per_ip: default_max_connections_per_ip(),
            connection_timeout: default_connection_timeout(),
            auto_start: false,
            admin_token: None,
        }
    }
}

impl Default for SecuritySettings {
    fn default() -> Self {
        let defaults = SecurityConfig::default();
        Self {
            max_message_size: defaults.max_message_size,
            max_json_depth: defaults.max_json_depth,
            max_string_length: defaults.max_string_length,
            max_collection_size: defaults.max_collection_size,
            max_outbound_queue: defaults.max_outbound_queue,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            file_path: None,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, creates a default configuration file at the specified path
    /// and returns the default configuration.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// The loaded or default configuration, or an error if loading/creation failed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("📝 Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Converts the application configuration to a game server configuration.
    ///
    /// Fails only if `bind_address` does not parse; call [`AppConfig::validate`]
    /// first to get a descriptive message.
    pub fn to_server_config(&self) -> Result<ServerConfig, Box<dyn std::error::Error>> {
        Ok(ServerConfig {
            bind_address: self.server.bind_address.parse()?,
            max_connections: self.server.max_connections,
            max_connections_per_ip: self.server.max_connections_per_ip,
            connection_timeout: self.server.connection_timeout,
            admin_token: self.server.admin_token.clone(),
            lobby: LobbyConfig {
                auto_start: self.server.auto_start,
            },
            security: SecurityConfig {
                max_message_size: self.security.max_message_size,
                max_json_depth: self.security.max_json_depth,
                max_string_length: self.security.max_string_length,
                max_collection_size: self.security.max_collection_size,
                max_outbound_queue: self.security.max_outbound_queue,
            },
        })
    }

    /// Validates the configuration for consistency and correctness.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the configuration is valid, or an error string describing the issue.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.bind_address.parse::<SocketAddr>().is_err() {
            return Err(format!(
                "Invalid bind address: {}",
                &self.server.bind_address
            ));
        }

        if self.server.max_connections == 0 {
            return Err("server.max_connections must be greater than 0".to_string());
        }

        if self.server.max_connections_per_ip == 0 {
            return Err("server.max_connections_per_ip must be greater than 0".to_string());
        }

        if self.server.connection_timeout == 0 {
            return Err("server.connection_timeout must be greater than 0".to_string());
        }

        if matches!(&self.server.admin_token, Some(token) if token.trim().is_empty()) {
            return Err("server.admin_token cannot be blank; omit it to disable".to_string());
        }

        if self.security.max_message_size == 0 {
            return Err("security.max_message_size must be greater than 0".to_string());
        }

        if self.security.max_outbound_queue == 0 {
            return Err("security.max_outbound_queue must be greater than 0".to_string());
        }

        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {VALID_LOG_LEVELS:?}",
                &self.logging.level
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{NamedTempFile, TempDir};
    use tokio::fs;

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();

        assert_eq!(config.server.bind_address, "127.0.0.1:8080");
        assert_eq!(config.server.max_connections, 1000);
        assert_eq!(config.server.max_connections_per_ip, 10);
        assert_eq!(config.server.connection_timeout, 60);
        assert!(!config.server.auto_start);
        assert!(config.server.admin_token.is_none());

        assert_eq!(config.security.max_message_size, 16 * 1024);
        assert_eq!(config.security.max_json_depth, 10);
        assert_eq!(config.security.max_outbound_queue, 256);

        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json_format);
        assert!(config.logging.file_path.is_none());

        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_load_from_nonexistent_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let config = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(config, AppConfig::default());

        // The default file is written and reads back identically.
        assert!(path.exists());
        let reloaded = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(reloaded, config);
    }

    #[tokio::test]
    async fn test_load_from_existing_file() {
        let toml_content = r#"
[server]
bind_address = "0.0.0.0:3000"
max_connections = 2000
max_connections_per_ip = 4
connection_timeout = 90
auto_start = true
admin_token = "letmein"

[security]
max_message_size = 4096

[logging]
level = "debug"
json_format = true
file_path = "/tmp/noughts.log"
"#;

        let temp_file = NamedTempFile::new().unwrap();
        fs::write(temp_file.path(), toml_content).await.unwrap();

        let config = AppConfig::load_from_file(temp_file.path()).await.unwrap();

        assert_eq!(config.server.bind_address, "0.0.0.0:3000");
        assert_eq!(config.server.max_connections, 2000);
        assert_eq!(config.server.max_connections_per_ip, 4);
        assert_eq!(config.server.connection_timeout, 90);
        assert!(config.server.auto_start);
        assert_eq!(config.server.admin_token.as_deref(), Some("letmein"));

        assert_eq!(config.security.max_message_size, 4096);
        // Unlisted limits fall back to their defaults.
        assert_eq!(config.security.max_json_depth, 10);

        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json_format);
        assert_eq!(config.logging.file_path.as_deref(), Some("/tmp/noughts.log"));
    }

    #[tokio::test]
    async fn test_load_rejects_malformed_toml() {
        let temp_file = NamedTempFile::new().unwrap();
        fs::write(temp_file.path(), "[server\nbind_address = ").await.unwrap();

        assert!(AppConfig::load_from_file(temp_file.path()).await.is_err());
    }

    #[test]
    fn test_serde_deserialization_with_defaults() {
        let config: AppConfig =
            toml::from_str("[server]\nbind_address = \"10.0.0.1:7000\"\n").unwrap();

        assert_eq!(config.server.bind_address, "10.0.0.1:7000");
        assert_eq!(config.server.max_connections, 1000);
        assert_eq!(config.security, SecuritySettings::default());
        assert_eq!(config.logging, LoggingSettings::default());
    }

    #[test]
    fn test_to_server_config_conversion() {
        let mut config = AppConfig::default();
        config.server.bind_address = "192.168.1.100:8080".to_string();
        config.server.max_connections = 3000;
        config.server.max_connections_per_ip = 3;
        config.server.connection_timeout = 15;
        config.server.auto_start = true;
        config.server.admin_token = Some("s3cret".to_string());
        config.security.max_string_length = 256;
        config.security.max_outbound_queue = 32;

        let server_config = config.to_server_config().unwrap();

        assert_eq!(server_config.bind_address.to_string(), "192.168.1.100:8080");
        assert_eq!(server_config.max_connections, 3000);
        assert_eq!(server_config.max_connections_per_ip, 3);
        assert_eq!(server_config.connection_timeout, 15);
        assert!(server_config.lobby.auto_start);
        assert_eq!(server_config.admin_token.as_deref(), Some("s3cret"));
        assert_eq!(server_config.security.max_string_length, 256);
        assert_eq!(server_config.security.max_outbound_queue, 32);
    }

    #[test]
    fn test_validation_invalid_bind_address() {
        let mut config = AppConfig::default();
        config.server.bind_address = "invalid".to_string();

        let err = config.validate().unwrap_err();
        assert!(err.contains("Invalid bind address"));
        assert!(config.to_server_config().is_err());
    }

    #[test]
    fn test_validation_zero_limits() {
        let mut config = AppConfig::default();
        config.server.max_connections = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.security.max_message_size = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.security.max_outbound_queue = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.server.connection_timeout = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_blank_admin_token() {
        let mut config = AppConfig::default();
        config.server.admin_token = Some("   ".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_log_levels() {
        let mut config = AppConfig::default();
        for level in VALID_LOG_LEVELS {
            config.logging.level = level.to_string();
            assert!(config.validate().is_ok(), "{level} should be accepted");
        }

        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }
}
