//! Configuration types.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8000;

/// Default sign-in page.
pub const DEFAULT_LOGIN_URL: &str = "/accounts/login/";

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub listing: ListingConfig,

    #[serde(default)]
    pub access: AccessConfig,
}

/// Listener and storage settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind (default: 127.0.0.1).
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind (default: 8000). Port 0 picks a free port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            db_path: default_db_path(),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_db_path() -> PathBuf {
    PathBuf::from("task-manager/tasks.db")
}

/// Page sizes and dashboard limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingConfig {
    #[serde(default = "default_workers_page_size")]
    pub workers_page_size: i64,

    /// Page size for incomplete-task and search listings.
    #[serde(default = "default_tasks_page_size")]
    pub tasks_page_size: i64,

    /// Entries per dashboard panel.
    #[serde(default = "default_dashboard_limit")]
    pub dashboard_limit: i64,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            workers_page_size: default_workers_page_size(),
            tasks_page_size: default_tasks_page_size(),
            dashboard_limit: default_dashboard_limit(),
        }
    }
}

fn default_workers_page_size() -> i64 {
    7
}

fn default_tasks_page_size() -> i64 {
    10
}

fn default_dashboard_limit() -> i64 {
    10
}

/// Identity and read-access settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Request header carrying the authenticated username.
    #[serde(default = "default_identity_header")]
    pub identity_header: String,

    /// Where unauthenticated requests are redirected.
    #[serde(default = "default_login_url")]
    pub login_url: String,

    /// Let anonymous callers list and view task types.
    #[serde(default)]
    pub public_task_type_reads: bool,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            identity_header: default_identity_header(),
            login_url: default_login_url(),
            public_task_type_reads: false,
        }
    }
}

fn default_identity_header() -> String {
    "x-remote-user".to_string()
}

fn default_login_url() -> String {
    DEFAULT_LOGIN_URL.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.listing.workers_page_size, 7);
        assert_eq!(config.listing.dashboard_limit, 10);
        assert_eq!(config.access.identity_header, "x-remote-user");
        assert!(!config.access.public_task_type_reads);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config: Config = serde_yaml::from_str("access:\n  public_task_type_reads: true\n").unwrap();
        assert!(config.access.public_task_type_reads);
        assert_eq!(config.access.login_url, "/accounts/login/");
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn socket_addr_parses() {
        let server = ServerConfig {
            port: 9000,
            ..Default::default()
        };
        assert_eq!(server.socket_addr().unwrap().port(), 9000);
        let bad = ServerConfig {
            host: "not a host".into(),
            ..Default::default()
        };
        assert!(bad.socket_addr().is_err());
    }
}
