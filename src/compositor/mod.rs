//! Compositor query/command interface
//!
//! The orchestrators only talk to the compositor through the [`Compositor`]
//! trait. [`HyprctlClient`] drives a live Hyprland instance; [`MockCompositor`]
//! simulates one in memory for tests.

pub mod hyprctl;
pub mod mock;

use async_trait::async_trait;
use thiserror::Error;

use crate::snapshot::{Position, Size, WorkspaceId};

pub use hyprctl::HyprctlClient;
pub use mock::{MockApp, MockCompositor};

#[derive(Error, Debug)]
pub enum CompositorError {
    #[error("Command `{command}` failed: {message}")]
    CommandFailed { command: String, message: String },
    #[error("Compositor rejected `{command}`: {reply}")]
    Rejected { command: String, reply: String },
    #[error("Failed to parse `{query}` output: {source}")]
    Parse {
        query: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("`{command}` timed out after {timeout_ms} ms")]
    Timeout { command: String, timeout_ms: u64 },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A window currently mapped by the compositor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveWindow {
    pub address: String,
    pub class: String,
    pub title: String,
    pub workspace_id: WorkspaceId,
    pub position: Position,
    pub size: Size,
    pub floating: bool,
    pub fullscreen: bool,
    pub pinned: bool,
    pub monitor_id: i64,
    /// 0 for the most recently focused window
    pub focus_history_id: i64,
}

impl LiveWindow {
    pub fn new(address: impl Into<String>, class: impl Into<String>, workspace_id: WorkspaceId) -> Self {
        let class = class.into();
        Self {
            address: address.into(),
            title: class.clone(),
            class,
            workspace_id,
            position: Position::default(),
            size: Size::default(),
            floating: false,
            fullscreen: false,
            pinned: false,
            monitor_id: 0,
            focus_history_id: -1,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn is_focused(&self) -> bool {
        self.focus_history_id == 0
    }
}

/// A workspace currently known to the compositor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveWorkspace {
    pub id: WorkspaceId,
    pub name: String,
    pub monitor: String,
    pub monitor_id: Option<i64>,
    pub windows: usize,
    pub has_fullscreen: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Monitor {
    pub id: i64,
    pub name: String,
    pub focused: bool,
    pub active_workspace_id: Option<WorkspaceId>,
}

/// A mutating request sent to the compositor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompositorCommand {
    /// Switch to a workspace, creating it if absent
    SwitchWorkspace(WorkspaceId),
    RenameWorkspace { id: WorkspaceId, name: String },
    MoveToWorkspace { address: String, workspace_id: WorkspaceId },
    ToggleFloating { address: String },
    SetFullscreen { address: String, enabled: bool },
    /// Toggles the pinned flag
    Pin { address: String },
    FocusWindow { address: String },
    SetGeometry { address: String, position: Position, size: Size },
    /// Spawn on the active workspace
    Exec { command: String },
    /// Spawn pre-bound to a workspace without switching to it
    ExecOnWorkspace { command: String, workspace_id: WorkspaceId },
}

impl CompositorCommand {
    /// Short human-readable form, used in logs and errors
    pub fn describe(&self) -> String {
        match self {
            CompositorCommand::SwitchWorkspace(id) => format!("workspace {}", id),
            CompositorCommand::RenameWorkspace { id, name } => {
                format!("renameworkspace {} {}", id, name)
            }
            CompositorCommand::MoveToWorkspace {
                address,
                workspace_id,
            } => format!("movetoworkspacesilent {},address:{}", workspace_id, address),
            CompositorCommand::ToggleFloating { address } => {
                format!("togglefloating address:{}", address)
            }
            CompositorCommand::SetFullscreen { address, enabled } => {
                format!("fullscreen {} address:{}", enabled, address)
            }
            CompositorCommand::Pin { address } => format!("pin address:{}", address),
            CompositorCommand::FocusWindow { address } => {
                format!("focuswindow address:{}", address)
            }
            CompositorCommand::SetGeometry {
                address,
                position,
                size,
            } => format!(
                "geometry {},{} {}x{} address:{}",
                position.x, position.y, size.width, size.height, address
            ),
            CompositorCommand::Exec { command } => format!("exec {}", command),
            CompositorCommand::ExecOnWorkspace {
                command,
                workspace_id,
            } => format!("exec [workspace {} silent] {}", workspace_id, command),
        }
    }
}

/// Narrow typed surface over the compositor's control interface
#[async_trait]
pub trait Compositor: Send + Sync {
    /// All mapped windows
    async fn clients(&self) -> Result<Vec<LiveWindow>, CompositorError>;

    /// All existing workspaces
    async fn workspaces(&self) -> Result<Vec<LiveWorkspace>, CompositorError>;

    async fn monitors(&self) -> Result<Vec<Monitor>, CompositorError>;

    /// Id of the focused workspace, if any
    async fn active_workspace(&self) -> Result<Option<WorkspaceId>, CompositorError>;

    /// Apply one command
    async fn dispatch(&self, command: &CompositorCommand) -> Result<(), CompositorError>;
}
