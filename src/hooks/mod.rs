//! External per-application hooks
//!
//! A hook is an executable in the hooks directory. It receives one argument,
//! `pre-save` or `post-restore`, and may keep files in its own subdirectory
//! of the snapshot directory, passed as `HYPRSESSION_APP_DIR`. Hooks run one
//! at a time in filename order. A hook named `comprehensive` replaces the
//! whole set.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;

use crate::config::HookConfig;
use crate::launch::CAPABILITIES_FILE;

/// Snapshot directory, for hooks that need to look around
pub const SESSION_DIR_ENV: &str = "HYPRSESSION_SESSION_DIR";
/// The hook's private subdirectory
pub const APP_DIR_ENV: &str = "HYPRSESSION_APP_DIR";

const COMPREHENSIVE_STEM: &str = "comprehensive";

#[derive(Error, Debug)]
pub enum HookError {
    #[error("Failed to start hook {hook}: {source}")]
    Spawn {
        hook: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Hook {hook} exited with {status}")]
    Exit { hook: String, status: String },
    #[error("Hook {hook} timed out after {timeout_secs}s")]
    Timeout { hook: String, timeout_secs: u64 },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookMode {
    PreSave,
    PostRestore,
}

impl HookMode {
    /// The argument passed to every hook
    pub fn as_arg(&self) -> &'static str {
        match self {
            HookMode::PreSave => "pre-save",
            HookMode::PostRestore => "post-restore",
        }
    }
}

/// A discovered hook executable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hook {
    /// File stem; also the name of the hook's private subdirectory
    pub name: String,
    pub path: PathBuf,
}

/// Outcome of running every hook for one mode
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookReport {
    pub ran: usize,
    /// (hook name, error message)
    pub failures: Vec<(String, String)>,
}

impl HookReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn succeeded(&self) -> usize {
        self.ran - self.failures.len()
    }
}

#[derive(Debug, Clone)]
pub struct HookRunner {
    dir: PathBuf,
    timeout: Duration,
    enabled: bool,
}

impl HookRunner {
    pub fn new(dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            dir: dir.into(),
            timeout,
            enabled: true,
        }
    }

    pub fn from_config(dir: impl Into<PathBuf>, config: &HookConfig) -> Self {
        Self {
            enabled: config.enabled,
            ..Self::new(dir, config.timeout)
        }
    }

    /// Runner that never runs anything
    pub fn disabled() -> Self {
        Self {
            dir: PathBuf::new(),
            timeout: Duration::ZERO,
            enabled: false,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Hooks that would run, in execution order
    pub fn discover(&self) -> Vec<Hook> {
        if !self.enabled {
            return Vec::new();
        }
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };

        let mut hooks: Vec<Hook> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|path| is_hook_file(path))
            .filter_map(|path| {
                let name = path.file_stem()?.to_str()?.to_string();
                Some(Hook { name, path })
            })
            .collect();
        hooks.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));

        if let Some(comprehensive) = hooks.iter().find(|h| h.name == COMPREHENSIVE_STEM) {
            tracing::debug!(hook = %comprehensive.path.display(), "Comprehensive hook overrides per-application hooks");
            return vec![comprehensive.clone()];
        }
        hooks
    }

    /// Run every hook for `mode`, continuing past failures
    pub async fn run_all(&self, mode: HookMode, session_dir: &Path) -> HookReport {
        let mut report = HookReport::default();
        for hook in self.discover() {
            report.ran += 1;
            match self.run_one(&hook, mode, session_dir).await {
                Ok(()) => {
                    tracing::info!(hook = %hook.name, mode = mode.as_arg(), "Hook completed");
                }
                Err(e) => {
                    tracing::warn!(hook = %hook.name, mode = mode.as_arg(), error = %e, "Hook failed");
                    report.failures.push((hook.name.clone(), e.to_string()));
                }
            }
        }
        report
    }

    /// Run a single hook, bounded by the configured timeout
    pub async fn run_one(
        &self,
        hook: &Hook,
        mode: HookMode,
        session_dir: &Path,
    ) -> Result<(), HookError> {
        let app_dir = session_dir.join(&hook.name);
        fs::create_dir_all(&app_dir)?;

        let mut cmd = Command::new(&hook.path);
        cmd.arg(mode.as_arg())
            .env(SESSION_DIR_ENV, session_dir)
            .env(APP_DIR_ENV, &app_dir)
            .current_dir(&app_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => result.map_err(|source| HookError::Spawn {
                hook: hook.name.clone(),
                source,
            })?,
            Err(_) => {
                return Err(HookError::Timeout {
                    hook: hook.name.clone(),
                    timeout_secs: self.timeout.as_secs(),
                })
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            tracing::debug!(hook = %hook.name, stderr = %stderr.trim(), "Hook stderr");
        }

        if output.status.success() {
            Ok(())
        } else {
            Err(HookError::Exit {
                hook: hook.name.clone(),
                status: output.status.to_string(),
            })
        }
    }
}

fn is_hook_file(path: &Path) -> bool {
    let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if file_name.starts_with('.') || file_name == CAPABILITIES_FILE {
        return false;
    }
    let Ok(metadata) = fs::metadata(path) else {
        return false;
    };
    metadata.is_file() && is_executable(&metadata)
}

#[cfg(unix)]
fn is_executable(metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &fs::Metadata) -> bool {
    true
}
