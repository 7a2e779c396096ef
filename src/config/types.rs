//! Core configuration types and loading.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

use super::defaults::default_database_path;
use super::members::{AuthConfig, MembersConfig, PaginationConfig, SanctionsConfig};
use super::notify::NotifyConfig;
use super::staff::StaffBlock;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Daemon configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server information.
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Member registry settings (bot account, forbidden domains, tokens).
    #[serde(default)]
    pub members: MembersConfig,
    /// Listing page sizes.
    #[serde(default)]
    pub pagination: PaginationConfig,
    /// Sanction expiry sweep settings.
    #[serde(default)]
    pub sanctions: SanctionsConfig,
    /// Access token settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Notification delivery backend.
    #[serde(default)]
    pub notify: NotifyConfig,
    /// Staff accounts provisioned at startup.
    #[serde(default)]
    pub staff: Vec<StaffBlock>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Server identity and listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server name, used in logs and notification context.
    pub name: String,
    /// Address the member API binds to.
    pub listen: SocketAddr,
    /// Prometheus metrics HTTP port (absent or 0 disables the endpoint).
    pub metrics_port: Option<u16>,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file, or `:memory:`.
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NotifyBackend;

    const MINIMAL: &str = r#"
[server]
name = "members.test"
listen = "127.0.0.1:8080"
"#;

    #[test]
    fn minimal_config_uses_defaults() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.server.name, "members.test");
        assert_eq!(config.database.path, "sanctiond.db");
        assert_eq!(config.members.bot_account, "admin");
        assert_eq!(config.pagination.page_size, 10);
        assert_eq!(config.pagination.max_page_size, 20);
        assert_eq!(config.sanctions.sweep_interval_secs, 60);
        assert_eq!(config.notify.backend, NotifyBackend::Log);
        assert!(config.staff.is_empty());
        assert!(config.server.metrics_port.is_none());
    }

    #[test]
    fn staff_blocks_are_parsed() {
        let toml = format!(
            "{MINIMAL}\n[[staff]]\nusername = \"modo\"\nemail = \"modo@example.com\"\npassword = \"hostel77\"\n"
        );
        let config: Config = toml::from_str(&toml).unwrap();
        assert_eq!(config.staff.len(), 1);
        assert_eq!(config.staff[0].username, "modo");
    }

    #[test]
    fn missing_server_section_is_a_parse_error() {
        let result: Result<Config, _> = toml::from_str("[database]\npath = \"x.db\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Config::load("/nonexistent/sanctiond.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, MINIMAL).unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.server.listen.port(), 8080);
    }
}
