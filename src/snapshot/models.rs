//! Session snapshot data model

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::SnapshotError;

/// Compositor workspace identifier
pub type WorkspaceId = i64;

/// One workspace as it existed at capture time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceLayout {
    pub id: WorkspaceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub monitor_name: String,
    pub monitor_index: i64,
    pub window_count: usize,
    pub has_fullscreen_window: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

/// One window as it existed at capture time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowState {
    /// Compositor address; only meaningful within the run that captured it
    pub address: String,
    /// Stable identifier used to match windows across a restart
    pub application_class: String,
    pub title: String,
    pub workspace_id: WorkspaceId,
    pub position: Position,
    pub size: Size,
    pub floating: bool,
    pub fullscreen: bool,
    pub pinned: bool,
    pub monitor_name: String,
    pub focused: bool,
}

/// Where to launch an application during restore
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationWorkspaceAssignment {
    pub application_class: String,
    pub target_workspace_id: WorkspaceId,
    pub representative_title: String,
    pub launch_command: String,
}

/// Root entity for one capture event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub timestamp: DateTime<Utc>,
    /// Sorted by ascending id
    pub workspaces: Vec<WorkspaceLayout>,
    pub windows: Vec<WindowState>,
    pub application_map: Vec<ApplicationWorkspaceAssignment>,
    /// Workspace that was focused at capture time, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_workspace_id: Option<WorkspaceId>,
    #[serde(default)]
    pub monitors: Vec<String>,
}

impl SessionSnapshot {
    /// Workspaces are sorted by id
    pub fn new(
        timestamp: DateTime<Utc>,
        mut workspaces: Vec<WorkspaceLayout>,
        windows: Vec<WindowState>,
        application_map: Vec<ApplicationWorkspaceAssignment>,
    ) -> Self {
        workspaces.sort_by_key(|w| w.id);
        Self {
            timestamp,
            workspaces,
            windows,
            application_map,
            active_workspace_id: None,
            monitors: Vec::new(),
        }
    }

    pub fn with_active_workspace(mut self, id: Option<WorkspaceId>) -> Self {
        self.active_workspace_id = id;
        self
    }

    pub fn with_monitors(mut self, monitors: Vec<String>) -> Self {
        self.monitors = monitors;
        self
    }

    /// Workspace ids in replay order (ascending)
    pub fn workspace_ids(&self) -> Vec<WorkspaceId> {
        let mut ids: Vec<_> = self.workspaces.iter().map(|w| w.id).collect();
        ids.sort_unstable();
        ids
    }

    /// Check internal consistency.
    ///
    /// Workspace ids must be unique, every window and assignment must
    /// point at a recorded workspace, and assignments must be unique per
    /// `(class, workspace)` pair.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        let mut ids = HashSet::new();
        for workspace in &self.workspaces {
            if !ids.insert(workspace.id) {
                return Err(SnapshotError::DuplicateWorkspace(workspace.id));
            }
        }

        for window in &self.windows {
            if !ids.contains(&window.workspace_id) {
                return Err(SnapshotError::DanglingWindow {
                    address: window.address.clone(),
                    workspace_id: window.workspace_id,
                });
            }
        }

        let mut pairs = HashSet::new();
        for assignment in &self.application_map {
            if !ids.contains(&assignment.target_workspace_id) {
                return Err(SnapshotError::DanglingAssignment {
                    class: assignment.application_class.clone(),
                    workspace_id: assignment.target_workspace_id,
                });
            }
            if !pairs.insert((
                assignment.application_class.as_str(),
                assignment.target_workspace_id,
            )) {
                return Err(SnapshotError::DuplicateAssignment {
                    class: assignment.application_class.clone(),
                    workspace_id: assignment.target_workspace_id,
                });
            }
        }

        Ok(())
    }

    /// Flatten into the traditional application list
    pub fn traditional_entries(&self) -> Vec<TraditionalEntry> {
        let mut seen = HashSet::new();
        self.application_map
            .iter()
            .filter(|a| seen.insert(a.application_class.as_str()))
            .map(|a| TraditionalEntry {
                application_class: a.application_class.clone(),
                launch_command: a.launch_command.clone(),
            })
            .collect()
    }
}

/// Group windows by `(class, workspace)` and keep one representative per group.
///
/// Output order follows the first appearance of each pair in `windows`.
/// `resolve_command` supplies the launch command for a class on a workspace.
pub fn derive_assignments<F>(
    windows: &[WindowState],
    mut resolve_command: F,
) -> Vec<ApplicationWorkspaceAssignment>
where
    F: FnMut(&str, WorkspaceId) -> String,
{
    let mut index: HashMap<(&str, WorkspaceId), usize> = HashMap::new();
    let mut assignments: Vec<ApplicationWorkspaceAssignment> = Vec::new();

    for window in windows {
        let key = (window.application_class.as_str(), window.workspace_id);
        if index.contains_key(&key) {
            continue;
        }
        index.insert(key, assignments.len());
        assignments.push(ApplicationWorkspaceAssignment {
            application_class: window.application_class.clone(),
            target_workspace_id: window.workspace_id,
            representative_title: window.title.clone(),
            launch_command: resolve_command(&window.application_class, window.workspace_id),
        });
    }

    assignments
}

/// One line of the traditional application list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraditionalEntry {
    pub application_class: String,
    pub launch_command: String,
}

impl TraditionalEntry {
    /// Parse `class<TAB>command`, or a bare class whose command is the
    /// lowercased class name. Blank lines and `#` comments yield None.
    pub fn parse_line(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        let (class, command) = match line.split_once('\t') {
            Some((class, command)) => (class.trim(), command.trim()),
            None => (line, ""),
        };
        if class.is_empty() {
            return None;
        }
        let launch_command = if command.is_empty() {
            class.to_lowercase()
        } else {
            command.to_string()
        };
        Some(Self {
            application_class: class.to_string(),
            launch_command,
        })
    }

    pub fn to_line(&self) -> String {
        format!("{}\t{}", self.application_class, self.launch_command)
    }
}
