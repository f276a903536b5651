//! Snapshot store: on-disk layout and atomic writes
//!
//! One directory holds the current snapshot:
//! - `workspace_layouts.json`, `window_states.json`,
//!   `application_assignments.json`: the enhanced tier
//! - `session_meta.json`: format version, active workspace, monitors
//! - `timestamp`: RFC 3339 capture time marker
//! - `applications.txt`: the traditional tier (`class<TAB>command` per line)
//! - one subdirectory per hook, owned by that hook
//!
//! Every file is written to a temporary file in the same directory and
//! renamed into place, so a reader never sees a partially written file.
//! A whole capture goes through [`SnapshotStore::stage`]: files and hook
//! data land in a sibling staging directory that replaces the current
//! snapshot only once everything was written.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tempfile::{NamedTempFile, TempDir};

use super::error::SnapshotError;
use super::models::{
    ApplicationWorkspaceAssignment, SessionSnapshot, TraditionalEntry, WindowState, WorkspaceId,
    WorkspaceLayout,
};

pub const WORKSPACE_LAYOUTS_FILE: &str = "workspace_layouts.json";
pub const WINDOW_STATES_FILE: &str = "window_states.json";
pub const ASSIGNMENTS_FILE: &str = "application_assignments.json";
pub const META_FILE: &str = "session_meta.json";
pub const TIMESTAMP_FILE: &str = "timestamp";
pub const APPLICATIONS_FILE: &str = "applications.txt";

/// Layout version written to `session_meta.json`
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

const RESERVED_FILES: &[&str] = &[
    WORKSPACE_LAYOUTS_FILE,
    WINDOW_STATES_FILE,
    ASSIGNMENTS_FILE,
    META_FILE,
    TIMESTAMP_FILE,
    APPLICATIONS_FILE,
];

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionMeta {
    format_version: u32,
    timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    active_workspace_id: Option<WorkspaceId>,
    #[serde(default)]
    monitors: Vec<String>,
}

/// Store for the current snapshot directory
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn exists(&self) -> bool {
        self.dir.is_dir()
    }

    /// Private subdirectory for one application's hook
    pub fn app_dir(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Empty staging directory next to the snapshot directory. Nothing
    /// written there is visible until [`StagedSnapshot::commit`].
    pub fn stage(&self) -> Result<StagedSnapshot, SnapshotError> {
        let parent = self.parent_dir();
        fs::create_dir_all(&parent)?;
        let staging = tempfile::Builder::new()
            .prefix(".hyprsession-staging-")
            .tempdir_in(&parent)?;
        Ok(StagedSnapshot {
            store: SnapshotStore::new(staging.path()),
            staging,
            target: self.dir.clone(),
        })
    }

    fn parent_dir(&self) -> PathBuf {
        match self.dir.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Delete the entire snapshot directory. Returns false if there was none.
    pub fn clean(&self) -> Result<bool, SnapshotError> {
        if !self.dir.exists() {
            return Ok(false);
        }
        fs::remove_dir_all(&self.dir)?;
        tracing::info!(dir = %self.dir.display(), "Removed snapshot directory");
        Ok(true)
    }

    /// Persist every file of an enhanced snapshot plus the traditional list
    pub fn save(&self, snapshot: &SessionSnapshot) -> Result<(), SnapshotError> {
        fs::create_dir_all(&self.dir)?;

        self.write_json(WORKSPACE_LAYOUTS_FILE, &snapshot.workspaces)?;
        self.write_json(WINDOW_STATES_FILE, &snapshot.windows)?;
        self.write_json(ASSIGNMENTS_FILE, &snapshot.application_map)?;
        self.write_json(
            META_FILE,
            &SessionMeta {
                format_version: SNAPSHOT_FORMAT_VERSION,
                timestamp: snapshot.timestamp,
                active_workspace_id: snapshot.active_workspace_id,
                monitors: snapshot.monitors.clone(),
            },
        )?;
        self.save_traditional(&snapshot.traditional_entries())?;
        self.write_atomic(TIMESTAMP_FILE, snapshot.timestamp.to_rfc3339().as_bytes())?;

        tracing::info!(
            dir = %self.dir.display(),
            workspaces = snapshot.workspaces.len(),
            windows = snapshot.windows.len(),
            assignments = snapshot.application_map.len(),
            "Snapshot persisted"
        );
        Ok(())
    }

    /// Persist only the flat application list
    pub fn save_traditional(&self, entries: &[TraditionalEntry]) -> Result<(), SnapshotError> {
        fs::create_dir_all(&self.dir)?;
        let mut contents = String::new();
        for entry in entries {
            contents.push_str(&entry.to_line());
            contents.push('\n');
        }
        self.write_atomic(APPLICATIONS_FILE, contents.as_bytes())
    }

    /// Load the enhanced tier. All three structured files must exist, parse
    /// and be mutually consistent.
    pub fn load_enhanced(&self) -> Result<SessionSnapshot, SnapshotError> {
        let workspaces: Vec<WorkspaceLayout> = self.read_json(WORKSPACE_LAYOUTS_FILE)?;
        let windows: Vec<WindowState> = self.read_json(WINDOW_STATES_FILE)?;
        let assignments: Vec<ApplicationWorkspaceAssignment> = self.read_json(ASSIGNMENTS_FILE)?;

        let meta: Option<SessionMeta> = match self.read_json(META_FILE) {
            Ok(meta) => Some(meta),
            Err(SnapshotError::Missing(_)) => None,
            Err(e) => return Err(e),
        };
        if let Some(found) = meta
            .as_ref()
            .map(|m| m.format_version)
            .filter(|v| *v > SNAPSHOT_FORMAT_VERSION)
        {
            return Err(SnapshotError::UnsupportedVersion {
                path: self.dir.join(META_FILE),
                found,
            });
        }
        let timestamp = meta
            .as_ref()
            .map(|m| m.timestamp)
            .or_else(|| self.read_timestamp())
            .unwrap_or_else(Utc::now);

        let mut snapshot = SessionSnapshot::new(timestamp, workspaces, windows, assignments);
        if let Some(meta) = meta {
            snapshot = snapshot
                .with_active_workspace(meta.active_workspace_id)
                .with_monitors(meta.monitors);
        }
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Load the traditional tier
    pub fn load_traditional(&self) -> Result<Vec<TraditionalEntry>, SnapshotError> {
        let path = self.dir.join(APPLICATIONS_FILE);
        if !path.is_file() {
            return Err(SnapshotError::Missing(path));
        }
        let contents = fs::read_to_string(&path)?;
        let mut entries = Vec::new();
        for (idx, line) in contents.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            match TraditionalEntry::parse_line(trimmed) {
                Some(entry) => entries.push(entry),
                None => {
                    return Err(SnapshotError::MalformedLine {
                        path,
                        line: idx + 1,
                    })
                }
            }
        }
        Ok(entries)
    }

    /// Capture time from the timestamp marker, if present and parseable
    pub fn read_timestamp(&self) -> Option<DateTime<Utc>> {
        let raw = fs::read_to_string(self.dir.join(TIMESTAMP_FILE)).ok()?;
        DateTime::parse_from_rfc3339(raw.trim())
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    /// Names of the hook-owned subdirectories, sorted
    pub fn app_dirs(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .filter(|name| !RESERVED_FILES.contains(&name.as_str()))
            .collect();
        names.sort();
        names
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<T, SnapshotError> {
        let path = self.dir.join(name);
        if !path.is_file() {
            return Err(SnapshotError::Missing(path));
        }
        let contents = fs::read_to_string(&path)?;
        serde_json::from_str(&contents).map_err(|source| SnapshotError::Parse { path, source })
    }

    fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<(), SnapshotError> {
        let json = serde_json::to_string_pretty(value)?;
        self.write_atomic(name, json.as_bytes())
    }

    fn write_atomic(&self, name: &str, bytes: &[u8]) -> Result<(), SnapshotError> {
        write_atomic(&self.dir.join(name), bytes)?;
        Ok(())
    }
}

/// A snapshot being written in a staging directory.
///
/// Dropping it without committing discards the staging directory and leaves
/// the current snapshot untouched.
#[derive(Debug)]
pub struct StagedSnapshot {
    staging: TempDir,
    store: SnapshotStore,
    target: PathBuf,
}

impl StagedSnapshot {
    pub fn dir(&self) -> &Path {
        self.staging.path()
    }

    /// Store rooted at the staging directory
    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Swap the staging directory in for the current snapshot
    pub fn commit(self) -> Result<(), SnapshotError> {
        let aside = self.aside_path();
        if aside.exists() {
            fs::remove_dir_all(&aside)?;
        }
        // The previous snapshot moves aside first and is put back if the
        // swap fails
        let had_previous = self.target.exists();
        if had_previous {
            fs::rename(&self.target, &aside)?;
        }

        if let Err(e) = fs::rename(self.staging.path(), &self.target) {
            if had_previous {
                if let Err(restore_err) = fs::rename(&aside, &self.target) {
                    tracing::error!(
                        error = %restore_err,
                        previous = %aside.display(),
                        "Failed to put previous snapshot back"
                    );
                }
            }
            return Err(e.into());
        }

        if had_previous {
            if let Err(e) = fs::remove_dir_all(&aside) {
                tracing::warn!(error = %e, dir = %aside.display(), "Failed to remove previous snapshot");
            }
        }
        tracing::debug!(dir = %self.target.display(), "Staged snapshot committed");
        Ok(())
    }

    fn aside_path(&self) -> PathBuf {
        let name = self
            .target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "session".to_string());
        self.store.parent_dir().join(format!(".{}.previous", name))
    }
}

/// Write `bytes` to `path` via a temp file in the same directory + fsync + rename
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let mut file = NamedTempFile::new_in(parent)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}
