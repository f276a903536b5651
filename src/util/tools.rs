//! Locating `hyprctl`
//!
//! Also checks the one precondition that aborts a command before it
//! starts: a live Hyprland instance reachable through `hyprctl`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Environment variable Hyprland exports to every client of a running instance
pub const HYPRLAND_INSTANCE_ENV: &str = "HYPRLAND_INSTANCE_SIGNATURE";

const HYPRCTL_BINARY: &str = "hyprctl";

/// Where `hyprctl` was found, if anywhere
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolStatus {
    Available(PathBuf),
    /// Not configured and not in PATH
    NotFound,
    /// A path was configured in config.toml but is not an executable
    ConfiguredPathInvalid(PathBuf),
}

/// `[tools]` table of config.toml
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolPaths {
    pub hyprctl: Option<PathBuf>,
}

/// Resolve `hyprctl`. A configured path must exist and be executable;
/// otherwise the binary is looked up in PATH with `which`.
pub fn locate_hyprctl(paths: &ToolPaths) -> ToolStatus {
    if let Some(path) = &paths.hyprctl {
        return if is_valid_executable(path) {
            ToolStatus::Available(path.clone())
        } else {
            ToolStatus::ConfiguredPathInvalid(path.clone())
        };
    }

    match which::which(HYPRCTL_BINARY) {
        Ok(path) => ToolStatus::Available(path),
        Err(_) => ToolStatus::NotFound,
    }
}

fn is_valid_executable(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(metadata) = path.metadata() {
            return metadata.permissions().mode() & 0o111 != 0;
        }
        false
    }

    #[cfg(not(unix))]
    {
        true
    }
}

/// Whether the current environment belongs to a running Hyprland instance
pub fn hyprland_instance_present() -> bool {
    std::env::var_os(HYPRLAND_INSTANCE_ENV)
        .map(|v| !v.is_empty())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_path_that_does_not_exist_is_invalid() {
        let paths = ToolPaths {
            hyprctl: Some(PathBuf::from("/definitely/not/here/hyprctl")),
        };
        assert_eq!(
            locate_hyprctl(&paths),
            ToolStatus::ConfiguredPathInvalid(PathBuf::from("/definitely/not/here/hyprctl"))
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_configured_file_without_exec_bit_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("hyprctl");
        std::fs::write(&bin, "#!/bin/sh\n").unwrap();

        let status = locate_hyprctl(&ToolPaths {
            hyprctl: Some(bin.clone()),
        });
        assert_eq!(status, ToolStatus::ConfiguredPathInvalid(bin));
    }

    #[cfg(unix)]
    #[test]
    fn test_configured_executable_is_available() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("hyprctl");
        std::fs::write(&bin, "#!/bin/sh\necho ok\n").unwrap();
        std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();

        let status = locate_hyprctl(&ToolPaths {
            hyprctl: Some(bin.clone()),
        });
        assert_eq!(status, ToolStatus::Available(bin));
    }
}
