//! Hyprland client backed by the `hyprctl` command-line tool
//!
//! All JSON parsing of compositor output happens here; the rest of the
//! crate only sees the typed records from [`super`].

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

use super::{Compositor, CompositorCommand, CompositorError, LiveWindow, LiveWorkspace, Monitor};
use crate::snapshot::{Position, Size, WorkspaceId};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct RawWorkspaceRef {
    id: WorkspaceId,
}

/// `fullscreen` is a bool on older Hyprland releases and a mode integer on newer ones
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawFullscreen {
    Flag(bool),
    Mode(i64),
}

impl Default for RawFullscreen {
    fn default() -> Self {
        RawFullscreen::Flag(false)
    }
}

impl RawFullscreen {
    fn is_fullscreen(&self) -> bool {
        match self {
            RawFullscreen::Flag(flag) => *flag,
            RawFullscreen::Mode(mode) => *mode != 0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawClient {
    address: String,
    #[serde(default)]
    at: [i32; 2],
    #[serde(default)]
    size: [i32; 2],
    workspace: RawWorkspaceRef,
    #[serde(default)]
    floating: bool,
    #[serde(default)]
    fullscreen: RawFullscreen,
    #[serde(default)]
    pinned: bool,
    #[serde(default)]
    monitor: i64,
    #[serde(default)]
    class: String,
    #[serde(default)]
    title: String,
    #[serde(default = "unfocused", rename = "focusHistoryID")]
    focus_history_id: i64,
}

fn unfocused() -> i64 {
    -1
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawWorkspace {
    id: WorkspaceId,
    #[serde(default)]
    name: String,
    #[serde(default)]
    monitor: String,
    #[serde(default, rename = "monitorID")]
    monitor_id: Option<i64>,
    #[serde(default)]
    windows: usize,
    #[serde(default)]
    hasfullscreen: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMonitor {
    id: i64,
    name: String,
    #[serde(default)]
    focused: bool,
    #[serde(default)]
    active_workspace: Option<RawWorkspaceRef>,
}

/// Parse `hyprctl -j clients` output
pub fn parse_clients(json: &str) -> Result<Vec<LiveWindow>, serde_json::Error> {
    let raw: Vec<RawClient> = serde_json::from_str(json)?;
    Ok(raw
        .into_iter()
        .map(|c| LiveWindow {
            address: c.address,
            class: c.class,
            title: c.title,
            workspace_id: c.workspace.id,
            position: Position {
                x: c.at[0],
                y: c.at[1],
            },
            size: Size {
                width: c.size[0],
                height: c.size[1],
            },
            floating: c.floating,
            fullscreen: c.fullscreen.is_fullscreen(),
            pinned: c.pinned,
            monitor_id: c.monitor,
            focus_history_id: c.focus_history_id,
        })
        .collect())
}

/// Parse `hyprctl -j workspaces` output
pub fn parse_workspaces(json: &str) -> Result<Vec<LiveWorkspace>, serde_json::Error> {
    let raw: Vec<RawWorkspace> = serde_json::from_str(json)?;
    Ok(raw
        .into_iter()
        .map(|w| LiveWorkspace {
            id: w.id,
            name: w.name,
            monitor: w.monitor,
            monitor_id: w.monitor_id,
            windows: w.windows,
            has_fullscreen: w.hasfullscreen,
        })
        .collect())
}

/// Parse `hyprctl -j monitors` output
pub fn parse_monitors(json: &str) -> Result<Vec<Monitor>, serde_json::Error> {
    let raw: Vec<RawMonitor> = serde_json::from_str(json)?;
    Ok(raw
        .into_iter()
        .map(|m| Monitor {
            id: m.id,
            name: m.name,
            focused: m.focused,
            active_workspace_id: m.active_workspace.map(|w| w.id),
        })
        .collect())
}

/// Parse `hyprctl -j activeworkspace` output
pub fn parse_active_workspace(json: &str) -> Result<Option<WorkspaceId>, serde_json::Error> {
    let raw: Option<RawWorkspaceRef> = serde_json::from_str(json)?;
    Ok(raw.map(|w| w.id))
}

/// `(dispatcher, argument)` pairs issued for one command, in order
pub fn dispatch_args(command: &CompositorCommand) -> Vec<(&'static str, String)> {
    match command {
        CompositorCommand::SwitchWorkspace(id) => vec![("workspace", id.to_string())],
        CompositorCommand::RenameWorkspace { id, name } => {
            vec![("renameworkspace", format!("{} {}", id, name))]
        }
        CompositorCommand::MoveToWorkspace {
            address,
            workspace_id,
        } => vec![(
            "movetoworkspacesilent",
            format!("{},address:{}", workspace_id, address),
        )],
        CompositorCommand::ToggleFloating { address } => {
            vec![("togglefloating", format!("address:{}", address))]
        }
        // `fullscreen` acts on the focused window and toggles
        CompositorCommand::SetFullscreen { address, .. } => vec![
            ("focuswindow", format!("address:{}", address)),
            ("fullscreen", "0".to_string()),
        ],
        CompositorCommand::Pin { address } => vec![("pin", format!("address:{}", address))],
        CompositorCommand::FocusWindow { address } => {
            vec![("focuswindow", format!("address:{}", address))]
        }
        CompositorCommand::SetGeometry {
            address,
            position,
            size,
        } => vec![
            (
                "movewindowpixel",
                format!("exact {} {},address:{}", position.x, position.y, address),
            ),
            (
                "resizewindowpixel",
                format!("exact {} {},address:{}", size.width, size.height, address),
            ),
        ],
        CompositorCommand::Exec { command } => vec![("exec", command.clone())],
        CompositorCommand::ExecOnWorkspace {
            command,
            workspace_id,
        } => vec![(
            "exec",
            format!("[workspace {} silent] {}", workspace_id, command),
        )],
    }
}

/// Compositor client that shells out to `hyprctl`
#[derive(Debug, Clone)]
pub struct HyprctlClient {
    binary_path: PathBuf,
    timeout: Duration,
}

impl HyprctlClient {
    pub fn new(binary_path: impl Into<PathBuf>) -> Self {
        Self {
            binary_path: binary_path.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Check that the compositor answers queries
    pub async fn ping(&self) -> Result<(), CompositorError> {
        self.run(&["-j", "version"]).await.map(|_| ())
    }

    async fn run(&self, args: &[&str]) -> Result<String, CompositorError> {
        let rendered = args.join(" ");
        let mut cmd = Command::new(&self.binary_path);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(CompositorError::Timeout {
                    command: rendered,
                    timeout_ms: self.timeout.as_millis() as u64,
                })
            }
        };

        if !output.status.success() {
            return Err(CompositorError::CommandFailed {
                command: rendered,
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn query<T, F>(&self, name: &str, parse: F) -> Result<T, CompositorError>
    where
        F: FnOnce(&str) -> Result<T, serde_json::Error>,
    {
        let stdout = self.run(&["-j", name]).await?;
        parse(&stdout).map_err(|source| CompositorError::Parse {
            query: name.to_string(),
            source,
        })
    }

    async fn dispatch_one(&self, dispatcher: &str, arg: &str) -> Result<(), CompositorError> {
        tracing::debug!(dispatcher, arg, "hyprctl dispatch");
        let reply = self.run(&["dispatch", dispatcher, arg]).await?;
        let reply = reply.trim();
        if reply == "ok" {
            Ok(())
        } else {
            Err(CompositorError::Rejected {
                command: format!("{} {}", dispatcher, arg),
                reply: reply.to_string(),
            })
        }
    }
}

#[async_trait]
impl Compositor for HyprctlClient {
    async fn clients(&self) -> Result<Vec<LiveWindow>, CompositorError> {
        self.query("clients", parse_clients).await
    }

    async fn workspaces(&self) -> Result<Vec<LiveWorkspace>, CompositorError> {
        self.query("workspaces", parse_workspaces).await
    }

    async fn monitors(&self) -> Result<Vec<Monitor>, CompositorError> {
        self.query("monitors", parse_monitors).await
    }

    async fn active_workspace(&self) -> Result<Option<WorkspaceId>, CompositorError> {
        self.query("activeworkspace", parse_active_workspace).await
    }

    async fn dispatch(&self, command: &CompositorCommand) -> Result<(), CompositorError> {
        for (dispatcher, arg) in dispatch_args(command) {
            self.dispatch_one(dispatcher, &arg).await?;
        }
        Ok(())
    }
}
