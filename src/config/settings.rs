use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::restore::Tier;
use crate::util::paths::config_path;
use crate::util::tools::ToolPaths;

/// Example configuration file contents (bundled with the binary)
pub const EXAMPLE_CONFIG: &str = include_str!("config.toml.example");

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub restore: RestoreConfig,
    pub hooks: HookConfig,
    pub archive: ArchiveConfig,
    pub auto_save: AutoSaveConfig,
    /// Configured paths for external tools (hyprctl)
    pub tool_paths: ToolPaths,
    /// Per-class launch overrides from `[applications.<class>]`
    pub applications: BTreeMap<String, ApplicationOverride>,
}

/// Timing and policy knobs for a restore run
#[derive(Debug, Clone)]
pub struct RestoreConfig {
    /// Stagger between consecutive launches
    pub launch_delay: Duration,
    /// How many times to look for a launched application's window
    pub window_poll_attempts: u32,
    pub window_poll_interval: Duration,
    /// Pause before repositioning windows
    pub settle_delay: Duration,
    /// Tiers the fallback manager walks, best first
    pub tier_order: Vec<Tier>,
}

#[derive(Debug, Clone)]
pub struct HookConfig {
    pub enabled: bool,
    /// Upper bound on a single hook's run time
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    pub max_backups: usize,
    pub verify_checksums: bool,
}

/// Periodic capture for `hyprsession auto-save`
#[derive(Debug, Clone)]
pub struct AutoSaveConfig {
    pub interval: Duration,
}

/// Shortest auto-save interval a config file may ask for
pub const MIN_AUTO_SAVE_INTERVAL: Duration = Duration::from_secs(10);

/// Launch behaviour for one application class
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ApplicationOverride {
    /// Command template; `{class}` and `{workspace}` are substituted
    pub command: Option<String>,
    pub direct_workspace_launch: Option<bool>,
}

impl Default for RestoreConfig {
    fn default() -> Self {
        Self {
            launch_delay: Duration::from_millis(500),
            window_poll_attempts: 10,
            window_poll_interval: Duration::from_millis(500),
            settle_delay: Duration::from_secs(2),
            tier_order: Tier::default_order(),
        }
    }
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout: Duration::from_secs(30),
        }
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            max_backups: 10,
            verify_checksums: true,
        }
    }
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            restore: RestoreConfig::default(),
            hooks: HookConfig::default(),
            archive: ArchiveConfig::default(),
            auto_save: AutoSaveConfig::default(),
            tool_paths: ToolPaths::default(),
            applications: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlRestoreConfig {
    pub launch_delay_ms: Option<u64>,
    pub window_poll_attempts: Option<u32>,
    pub window_poll_interval_ms: Option<u64>,
    pub settle_delay_ms: Option<u64>,
    pub tier_order: Option<Vec<Tier>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlHookConfig {
    pub enabled: Option<bool>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlArchiveConfig {
    pub max_backups: Option<usize>,
    pub verify_checksums: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlAutoSaveConfig {
    pub interval_secs: Option<u64>,
}

/// TOML representation of the config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub restore: Option<TomlRestoreConfig>,
    pub hooks: Option<TomlHookConfig>,
    pub archive: Option<TomlArchiveConfig>,
    pub auto_save: Option<TomlAutoSaveConfig>,
    /// Tool path configuration
    pub tools: Option<ToolPaths>,
    pub applications: Option<BTreeMap<String, ApplicationOverride>>,
}

impl Config {
    /// Load configuration from `<data_dir>/config.toml`, merging with defaults.
    /// Writes the bundled example on first run.
    pub fn load() -> Result<Self, ConfigError> {
        let config_file = config_path();

        if !config_file.exists() {
            Self::create_default_config(&config_file);
        }

        if !config_file.exists() {
            return Ok(Config::default());
        }
        Self::load_from(&config_file)
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let toml_config =
            toml::from_str::<TomlConfig>(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Config::default().merge(toml_config)
    }

    /// Overlay user settings onto this configuration
    pub fn merge(mut self, toml_config: TomlConfig) -> Result<Self, ConfigError> {
        if let Some(restore) = toml_config.restore {
            if let Some(ms) = restore.launch_delay_ms {
                self.restore.launch_delay = Duration::from_millis(ms);
            }
            if let Some(attempts) = restore.window_poll_attempts {
                self.restore.window_poll_attempts = attempts;
            }
            if let Some(ms) = restore.window_poll_interval_ms {
                self.restore.window_poll_interval = Duration::from_millis(ms);
            }
            if let Some(ms) = restore.settle_delay_ms {
                self.restore.settle_delay = Duration::from_millis(ms);
            }
            if let Some(order) = restore.tier_order {
                self.restore.tier_order = order;
            }
        }

        if let Some(hooks) = toml_config.hooks {
            if let Some(enabled) = hooks.enabled {
                self.hooks.enabled = enabled;
            }
            if let Some(secs) = hooks.timeout_secs {
                self.hooks.timeout = Duration::from_secs(secs);
            }
        }

        if let Some(archive) = toml_config.archive {
            if let Some(max_backups) = archive.max_backups {
                self.archive.max_backups = max_backups;
            }
            if let Some(verify) = archive.verify_checksums {
                self.archive.verify_checksums = verify;
            }
        }

        if let Some(secs) = toml_config.auto_save.and_then(|a| a.interval_secs) {
            self.auto_save.interval = Duration::from_secs(secs);
        }

        if let Some(tools) = toml_config.tools {
            self.tool_paths = tools;
        }

        if let Some(applications) = toml_config.applications {
            self.applications.extend(applications);
        }

        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let order = &self.restore.tier_order;
        if order.is_empty() {
            return Err(ConfigError::Invalid(
                "restore.tier_order must name at least one tier".to_string(),
            ));
        }
        for (idx, tier) in order.iter().enumerate() {
            if order[..idx].contains(tier) {
                return Err(ConfigError::Invalid(format!(
                    "restore.tier_order lists `{}` more than once",
                    tier.as_str()
                )));
            }
        }
        if self.restore.window_poll_attempts == 0 {
            return Err(ConfigError::Invalid(
                "restore.window_poll_attempts must be at least 1".to_string(),
            ));
        }
        if self.auto_save.interval < MIN_AUTO_SAVE_INTERVAL {
            return Err(ConfigError::Invalid(format!(
                "auto_save.interval_secs must be at least {}",
                MIN_AUTO_SAVE_INTERVAL.as_secs()
            )));
        }
        Ok(())
    }

    /// Create the default config file from the bundled example
    fn create_default_config(path: &Path) {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                if let Err(e) = fs::create_dir_all(parent) {
                    tracing::warn!(error = %e, "Failed to create config directory");
                    return;
                }
            }
        }

        if let Err(e) = fs::write(path, EXAMPLE_CONFIG) {
            tracing::warn!(error = %e, "Failed to write default config");
        }
    }

    /// Zero every delay; used by tests and dry simulations
    pub fn without_delays(mut self) -> Self {
        self.restore.launch_delay = Duration::ZERO;
        self.restore.window_poll_interval = Duration::ZERO;
        self.restore.settle_delay = Duration::ZERO;
        self
    }
}
