use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::types::DEFAULT_TIMEOUT_SECONDS;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub flows: FlowsConfig,
    #[serde(default)]
    pub simulator: SimulatorConfig,
    pub paths: PathsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// REST API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Port to listen on (default: 7010)
    #[serde(default = "default_api_port")]
    pub port: u16,
    /// Operator recorded in audit rows when the `x-operator` header is absent
    #[serde(default = "default_operator")]
    pub default_operator: String,
}

fn default_api_port() -> u16 {
    7010
}

fn default_operator() -> String {
    "admin".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: default_api_port(),
            default_operator: default_operator(),
        }
    }
}

/// Which repository implementation backs the service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Volatile, lost on exit
    Memory,
    /// In-memory tables mirrored to a JSON snapshot
    #[default]
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Snapshot file; relative paths resolve against the state directory
    #[serde(default = "default_store_path")]
    pub path: String,
}

fn default_store_path() -> String {
    "flows.json".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_store_path(),
        }
    }
}

/// Scheduled publication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Interval in seconds between countdown refreshes (default: 60)
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
    /// Publish flows automatically once their scheduled time passes
    #[serde(default)]
    pub auto_publish: bool,
}

fn default_refresh_interval() -> u64 {
    60 // 1 minute
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval(),
            auto_publish: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowsConfig {
    /// Activating a flow deactivates the other active flows of its service
    #[serde(default)]
    pub exclusive_activation: bool,
    #[serde(default = "default_language")]
    pub default_language: String,
    #[serde(default = "default_timeout_seconds")]
    pub default_timeout_seconds: i32,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_timeout_seconds() -> i32 {
    DEFAULT_TIMEOUT_SECONDS
}

impl Default for FlowsConfig {
    fn default() -> Self {
        Self {
            exclusive_activation: false,
            default_language: default_language(),
            default_timeout_seconds: default_timeout_seconds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Shown when a selection does not match and the step has no fallback
    #[serde(default = "default_invalid_option_message")]
    pub invalid_option_message: String,
    /// Idle preview sessions older than this are discarded (default: 1800)
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,
}

fn default_invalid_option_message() -> String {
    crate::simulator::DEFAULT_INVALID_OPTION_MESSAGE.to_string()
}

fn default_session_ttl() -> u64 {
    1800 // 30 minutes
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            invalid_option_message: default_invalid_option_message(),
            session_ttl_secs: default_session_ttl(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    pub state: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether the API server logs to a file instead of stderr
    #[serde(default)]
    pub to_file: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            to_file: false,
        }
    }
}

impl Config {
    /// Project-local config file
    pub fn local_config_path() -> PathBuf {
        PathBuf::from("menuflow.toml")
    }

    pub fn load(config_path: Option<&str>) -> Result<Self> {
        // Start with embedded defaults so menuflow works without config files
        let defaults = Config::default();
        let defaults_json =
            serde_json::to_string(&defaults).context("Failed to serialize default config")?;

        let mut builder = config::Config::builder().add_source(config::File::from_str(
            &defaults_json,
            config::FileFormat::Json,
        ));

        let local_config = Self::local_config_path();
        if local_config.exists() {
            builder = builder.add_source(config::File::from(local_config));
        }

        // User config in ~/.config/menuflow/ (optional global overrides)
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("menuflow").join("config.toml");
            if user_config.exists() {
                builder = builder.add_source(config::File::from(user_config));
            }
        }

        // Explicit config file (CLI override)
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment variables, e.g. MENUFLOW__API__PORT=8080
        builder = builder.add_source(
            config::Environment::with_prefix("MENUFLOW")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to load configuration")?;
        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Save config to ./menuflow.toml
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::local_config_path())
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_str =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;
        std::fs::write(path, toml_str).context("Failed to write config file")?;

        Ok(())
    }

    /// Get absolute path to state directory
    pub fn state_path(&self) -> PathBuf {
        let path = PathBuf::from(&self.paths.state);
        if path.is_absolute() {
            path
        } else {
            std::env::current_dir().unwrap_or_default().join(path)
        }
    }

    /// Get absolute path to the flow store snapshot
    pub fn store_path(&self) -> PathBuf {
        let path = PathBuf::from(&self.store.path);
        if path.is_absolute() {
            path
        } else {
            self.state_path().join(path)
        }
    }

    /// Get absolute path to logs directory
    pub fn logs_path(&self) -> PathBuf {
        self.state_path().join("logs")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            store: StoreConfig::default(),
            schedule: ScheduleConfig::default(),
            flows: FlowsConfig::default(),
            simulator: SimulatorConfig::default(),
            paths: PathsConfig {
                state: ".menuflow".to_string(), // Relative to cwd
            },
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.port, 7010);
        assert_eq!(config.schedule.refresh_interval_secs, 60);
        assert!(!config.schedule.auto_publish);
        assert!(!config.flows.exclusive_activation);
        assert_eq!(config.store.backend, StoreBackend::File);
        assert_eq!(config.simulator.session_ttl_secs, 1800);
    }

    #[test]
    fn test_store_path_resolves_against_state() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.paths.state = temp_dir.path().to_string_lossy().to_string();

        assert_eq!(config.store_path(), temp_dir.path().join("flows.json"));
        assert!(config.logs_path().ends_with("logs"));
    }

    #[test]
    fn test_absolute_store_path_kept() {
        let mut config = Config::default();
        config.store.path = "/var/lib/menuflow/flows.json".to_string();
        assert_eq!(
            config.store_path(),
            PathBuf::from("/var/lib/menuflow/flows.json")
        );
    }

    #[test]
    fn test_load_explicit_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[api]\nport = 9090\n\n[schedule]\nauto_publish = true\n\n[store]\nbackend = \"memory\"\n",
        )
        .unwrap();

        let config = Config::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(config.api.port, 9090);
        assert!(config.schedule.auto_publish);
        assert_eq!(config.store.backend, StoreBackend::Memory);
        // Untouched sections keep their defaults
        assert_eq!(config.flows.default_language, "en");
    }

    #[test]
    fn test_save_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("menuflow.toml");

        let mut config = Config::default();
        config.flows.exclusive_activation = true;
        config.save_to(&path).unwrap();

        let loaded = Config::load(Some(path.to_str().unwrap())).unwrap();
        assert!(loaded.flows.exclusive_activation);
    }
}
