//! Path utilities for the session manager data directories

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Environment variable that overrides the data directory
pub const DATA_DIR_ENV: &str = "HYPRSESSION_DIR";

/// Global storage for custom data directory path
static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Initialize the data directory with an optional custom path.
/// Must be called early in main() before any other path functions are used.
/// If custom_path is None, uses `$HYPRSESSION_DIR` or the default location.
pub fn init_data_dir(custom_path: Option<PathBuf>) {
    let path = custom_path
        .or_else(|| std::env::var_os(DATA_DIR_ENV).map(PathBuf::from))
        .unwrap_or_else(default_data_dir);
    if DATA_DIR.set(path.clone()).is_err() {
        let existing = DATA_DIR
            .get()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        tracing::debug!(
            path = %path.display(),
            existing = %existing,
            "Data directory already initialized"
        );
    }
}

/// Get the default data directory path (~/.config/hyprland-session-manager)
fn default_data_dir() -> PathBuf {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .map(|c| c.join("hyprland-session-manager"))
        .unwrap_or_else(|| PathBuf::from(".hyprland-session-manager"))
}

/// Get the base data directory.
/// Returns the custom path if set via init_data_dir(), otherwise the default
pub fn data_dir() -> PathBuf {
    DATA_DIR.get().cloned().unwrap_or_else(default_data_dir)
}

/// Directory holding the current snapshot (<base>/session-state)
pub fn session_state_dir(base: &Path) -> PathBuf {
    base.join("session-state")
}

/// Directory holding pre-save / post-restore hooks (<base>/hooks)
pub fn hooks_dir(base: &Path) -> PathBuf {
    base.join("hooks")
}

/// Directory holding the checksummed state archive (<base>/archive)
pub fn archive_dir(base: &Path) -> PathBuf {
    base.join("archive")
}

/// Get the logs directory (<data_dir>/logs)
pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

/// Get the default log file path (<data_dir>/logs/hyprsession.log)
pub fn log_file_path() -> PathBuf {
    logs_dir().join("hyprsession.log")
}

/// Get the config file path (<data_dir>/config.toml)
pub fn config_path() -> PathBuf {
    data_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_under_base() {
        let base = Path::new("/data");
        assert_eq!(session_state_dir(base), PathBuf::from("/data/session-state"));
        assert_eq!(hooks_dir(base), PathBuf::from("/data/hooks"));
        assert_eq!(archive_dir(base), PathBuf::from("/data/archive"));
    }
}
