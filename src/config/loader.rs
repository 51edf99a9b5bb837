//! Configuration loader with tier-based merging.

use super::merge::deep_merge_all;
use super::types::Config;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Configuration tier priority (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigTier {
    /// Built-in defaults (lowest priority)
    Defaults = 0,
    /// Project-level config ($CWD/task-manager/)
    Project = 1,
    /// User-level config (~/.task-manager/)
    User = 2,
    /// Environment variables (highest priority)
    Environment = 3,
}

impl std::fmt::Display for ConfigTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigTier::Defaults => write!(f, "defaults"),
            ConfigTier::Project => write!(f, "project"),
            ConfigTier::User => write!(f, "user"),
            ConfigTier::Environment => write!(f, "environment"),
        }
    }
}

/// Where each file tier lives.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    /// Project-level config directory
    pub project_dir: Option<PathBuf>,
    /// User-level config directory
    pub user_dir: Option<PathBuf>,
    /// Explicit config file; replaces the project and user tiers
    pub explicit_file: Option<PathBuf>,
}

impl ConfigPaths {
    /// Discover configuration paths from the environment and the home directory.
    pub fn discover() -> Self {
        Self {
            project_dir: Some(PathBuf::from("task-manager")),
            user_dir: dirs::home_dir().map(|h| h.join(".task-manager")),
            explicit_file: std::env::var("TASK_MANAGER_CONFIG_PATH")
                .ok()
                .map(PathBuf::from),
        }
    }

    /// Create paths with explicit directories.
    pub fn with_dirs(project_dir: Option<PathBuf>, user_dir: Option<PathBuf>) -> Self {
        Self {
            project_dir,
            user_dir,
            explicit_file: None,
        }
    }

    /// Use `file` instead of the project and user tiers.
    pub fn with_explicit_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.explicit_file = Some(file.into());
        self
    }
}

/// Configuration loader that handles tier-based merging.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    pub paths: ConfigPaths,
    config: Config,
    /// Files that contributed, lowest tier first
    sources: Vec<(ConfigTier, PathBuf)>,
}

impl ConfigLoader {
    /// Load configuration from all tiers, reading overrides from the process environment.
    pub fn load() -> Result<Self> {
        Self::load_with_paths(ConfigPaths::discover())
    }

    /// Load configuration with explicit paths.
    pub fn load_with_paths(paths: ConfigPaths) -> Result<Self> {
        Self::load_with_env(paths, |key| std::env::var(key).ok())
    }

    /// Load configuration with explicit paths and environment lookup.
    pub fn load_with_env<F>(paths: ConfigPaths, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut layers: Vec<Value> = vec![serde_json::to_value(Config::default())?];
        let mut sources = Vec::new();

        if let Some(file) = &paths.explicit_file {
            // An explicit file must exist; a broken one is a startup error.
            let content = std::fs::read_to_string(file)
                .with_context(|| format!("reading config file {}", file.display()))?;
            let value: Value = serde_yaml::from_str(&content)
                .with_context(|| format!("parsing config file {}", file.display()))?;
            layers.push(value);
            sources.push((ConfigTier::Project, file.clone()));
        } else {
            for (tier, dir) in [
                (ConfigTier::Project, &paths.project_dir),
                (ConfigTier::User, &paths.user_dir),
            ] {
                let Some(dir) = dir else { continue };
                let file = dir.join("config.yaml");
                if let Some(value) = read_tier_file(tier, &file) {
                    layers.push(value);
                    sources.push((tier, file));
                }
            }
        }

        let merged = deep_merge_all(layers);
        let mut config: Config =
            serde_json::from_value(merged).context("invalid configuration values")?;

        apply_env_overrides(&mut config, env);

        debug!(?sources, "Configuration loaded");
        Ok(Self {
            paths,
            config,
            sources,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get mutable access to the configuration.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// The highest-tier file that was read, if any.
    pub fn config_path(&self) -> Option<&Path> {
        self.sources.last().map(|(_, path)| path.as_path())
    }

    pub fn sources(&self) -> &[(ConfigTier, PathBuf)] {
        &self.sources
    }
}

/// Read one optional tier file. Missing files are skipped; unreadable ones are
/// skipped with a warning.
fn read_tier_file(tier: ConfigTier, file: &Path) -> Option<Value> {
    if !file.exists() {
        return None;
    }
    let content = match std::fs::read_to_string(file) {
        Ok(content) => content,
        Err(e) => {
            warn!(%tier, path = %file.display(), error = %e, "Skipping unreadable config file");
            return None;
        }
    };
    match serde_yaml::from_str::<Value>(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(%tier, path = %file.display(), error = %e, "Skipping invalid config file");
            None
        }
    }
}

/// Apply `TASK_MANAGER_*` overrides.
fn apply_env_overrides<F>(config: &mut Config, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(db_path) = env("TASK_MANAGER_DB_PATH") {
        config.server.db_path = PathBuf::from(db_path);
    }

    if let Some(host) = env("TASK_MANAGER_HOST") {
        config.server.host = host;
    }

    if let Some(port) = env("TASK_MANAGER_PORT") {
        match port.parse() {
            Ok(port) => config.server.port = port,
            Err(_) => warn!(value = %port, "Ignoring invalid TASK_MANAGER_PORT"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_only() {
        let temp = TempDir::new().unwrap();
        let paths = ConfigPaths::with_dirs(
            Some(temp.path().join("project")),
            Some(temp.path().join("user")),
        );

        let loader = ConfigLoader::load_with_env(paths, no_env).unwrap();
        assert_eq!(loader.config(), &Config::default());
        assert!(loader.config_path().is_none());
    }

    #[test]
    fn user_tier_overrides_project_per_field() {
        let temp = TempDir::new().unwrap();
        let project_dir = temp.path().join("task-manager");
        let user_dir = temp.path().join("user");
        std::fs::create_dir_all(&project_dir).unwrap();
        std::fs::create_dir_all(&user_dir).unwrap();

        std::fs::write(
            project_dir.join("config.yaml"),
            "server:\n  port: 9000\n  host: 0.0.0.0\n",
        )
        .unwrap();
        std::fs::write(user_dir.join("config.yaml"), "server:\n  port: 9100\n").unwrap();

        let paths = ConfigPaths::with_dirs(Some(project_dir), Some(user_dir.clone()));
        let loader = ConfigLoader::load_with_env(paths, no_env).unwrap();

        assert_eq!(loader.config().server.port, 9100);
        assert_eq!(loader.config().server.host, "0.0.0.0");
        assert_eq!(loader.config_path(), Some(user_dir.join("config.yaml").as_path()));
        assert_eq!(loader.sources().len(), 2);
    }

    #[test]
    fn invalid_tier_file_is_skipped() {
        let temp = TempDir::new().unwrap();
        let project_dir = temp.path().join("task-manager");
        std::fs::create_dir_all(&project_dir).unwrap();
        std::fs::write(project_dir.join("config.yaml"), "server: [unclosed").unwrap();

        let paths = ConfigPaths::with_dirs(Some(project_dir), None);
        let loader = ConfigLoader::load_with_env(paths, no_env).unwrap();
        assert_eq!(loader.config(), &Config::default());
    }

    #[test]
    fn explicit_file_replaces_file_tiers() {
        let temp = TempDir::new().unwrap();
        let project_dir = temp.path().join("task-manager");
        std::fs::create_dir_all(&project_dir).unwrap();
        std::fs::write(project_dir.join("config.yaml"), "listing:\n  workers_page_size: 3\n")
            .unwrap();
        let explicit = temp.path().join("custom.yaml");
        std::fs::write(&explicit, "access:\n  login_url: /login/\n").unwrap();

        let paths = ConfigPaths::with_dirs(Some(project_dir), None).with_explicit_file(&explicit);
        let loader = ConfigLoader::load_with_env(paths, no_env).unwrap();

        assert_eq!(loader.config().access.login_url, "/login/");
        assert_eq!(loader.config().listing.workers_page_size, 7);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let paths = ConfigPaths::default().with_explicit_file(temp.path().join("nope.yaml"));
        assert!(ConfigLoader::load_with_env(paths, no_env).is_err());
    }

    #[test]
    fn environment_wins() {
        let temp = TempDir::new().unwrap();
        let project_dir = temp.path().join("task-manager");
        std::fs::create_dir_all(&project_dir).unwrap();
        std::fs::write(project_dir.join("config.yaml"), "server:\n  port: 9000\n").unwrap();

        let env: HashMap<&str, &str> = [
            ("TASK_MANAGER_PORT", "9500"),
            ("TASK_MANAGER_DB_PATH", "/tmp/other.db"),
        ]
        .into_iter()
        .collect();
        let paths = ConfigPaths::with_dirs(Some(project_dir), None);
        let loader =
            ConfigLoader::load_with_env(paths, |k| env.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(loader.config().server.port, 9500);
        assert_eq!(loader.config().server.db_path, PathBuf::from("/tmp/other.db"));
    }

    #[test]
    fn bad_port_in_environment_is_ignored() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, |k| {
            (k == "TASK_MANAGER_PORT").then(|| "eighty".to_string())
        });
        assert_eq!(config.server.port, 8000);
    }
}
