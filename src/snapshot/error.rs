use std::path::PathBuf;

use thiserror::Error;

use super::models::WorkspaceId;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Snapshot file missing: {0}")]
    Missing(PathBuf),
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{path} has format version {found}, newer than this build understands")]
    UnsupportedVersion { path: PathBuf, found: u32 },
    #[error("Malformed line {line} in {path}")]
    MalformedLine { path: PathBuf, line: usize },
    #[error("Duplicate workspace id {0}")]
    DuplicateWorkspace(WorkspaceId),
    #[error("Window {address} references unknown workspace {workspace_id}")]
    DanglingWindow {
        address: String,
        workspace_id: WorkspaceId,
    },
    #[error("Assignment for {class} references unknown workspace {workspace_id}")]
    DanglingAssignment {
        class: String,
        workspace_id: WorkspaceId,
    },
    #[error("Duplicate assignment for {class} on workspace {workspace_id}")]
    DuplicateAssignment {
        class: String,
        workspace_id: WorkspaceId,
    },
    #[error("Serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SnapshotError {
    /// Whether the error means the data exists but cannot be trusted,
    /// as opposed to simply not being there.
    pub fn is_corruption(&self) -> bool {
        !matches!(self, SnapshotError::Missing(_) | SnapshotError::Io(_))
    }
}
