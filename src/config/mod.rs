mod settings;

pub use settings::{
    ApplicationOverride, ArchiveConfig, AutoSaveConfig, Config, ConfigError, HookConfig,
    RestoreConfig, TomlConfig, EXAMPLE_CONFIG, MIN_AUTO_SAVE_INTERVAL,
};
