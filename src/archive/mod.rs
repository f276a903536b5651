//! Checksummed state archive
//!
//! The alternate persistence backend. A single JSON document holds a whole
//! snapshot together with SHA-256 checksums of its components, so a
//! truncated or hand-edited archive is detected before it is replayed.
//! Each save rotates the previous document into `backups/`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::ArchiveConfig;
use crate::snapshot::store::write_atomic;
use crate::snapshot::{SessionSnapshot, SnapshotError, SnapshotStore};

pub const STATE_FILE: &str = "state.json";
pub const BACKUP_DIR: &str = "backups";
const ARCHIVE_VERSION: u32 = 1;

const WORKSPACES_KEY: &str = "workspaces";
const WINDOWS_KEY: &str = "windows";
const ASSIGNMENTS_KEY: &str = "assignments";
const OVERALL_KEY: &str = "overall";

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("No archive at {0}")]
    Missing(PathBuf),
    #[error("Failed to parse archive {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Unsupported archive version {0}")]
    UnsupportedVersion(u32),
    #[error("Checksum mismatch for {component}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        component: String,
        expected: String,
        actual: String,
    },
    #[error("Archived snapshot is inconsistent: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("Failed to serialize archive: {0}")]
    Serialize(serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// On-disk archive document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedState {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub snapshot: SessionSnapshot,
    /// Component name to hex SHA-256
    pub checksums: BTreeMap<String, String>,
}

/// Presence and health of the archive, for `archive-status`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveStatus {
    pub present: bool,
    pub saved_at: Option<DateTime<Utc>>,
    pub captured_at: Option<DateTime<Utc>>,
    pub workspaces: usize,
    pub windows: usize,
    pub assignments: usize,
    /// None when nothing could be checked
    pub valid: Option<bool>,
    pub problem: Option<String>,
    pub backups: usize,
}

#[derive(Debug, Clone)]
pub struct StateArchive {
    dir: PathBuf,
    max_backups: usize,
    verify_checksums: bool,
}

impl StateArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let defaults = ArchiveConfig::default();
        Self {
            dir: dir.into(),
            max_backups: defaults.max_backups,
            verify_checksums: defaults.verify_checksums,
        }
    }

    pub fn from_config(dir: impl Into<PathBuf>, config: &ArchiveConfig) -> Self {
        Self {
            dir: dir.into(),
            max_backups: config.max_backups,
            verify_checksums: config.verify_checksums,
        }
    }

    pub fn state_path(&self) -> PathBuf {
        self.dir.join(STATE_FILE)
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.dir.join(BACKUP_DIR)
    }

    pub fn exists(&self) -> bool {
        self.state_path().is_file()
    }

    /// Write a new archive, rotating the current one into backups first
    pub fn save(&self, snapshot: &SessionSnapshot) -> Result<ArchivedState, ArchiveError> {
        fs::create_dir_all(&self.dir)?;

        let state = ArchivedState {
            version: ARCHIVE_VERSION,
            saved_at: Utc::now(),
            checksums: checksums(snapshot)?,
            snapshot: snapshot.clone(),
        };
        let json = serde_json::to_string_pretty(&state).map_err(ArchiveError::Serialize)?;

        if self.exists() {
            self.rotate_backup()?;
        }
        write_atomic(&self.state_path(), json.as_bytes())?;

        tracing::info!(
            path = %self.state_path().display(),
            workspaces = snapshot.workspaces.len(),
            windows = snapshot.windows.len(),
            "Archive saved"
        );
        Ok(state)
    }

    /// Read the archive without checking it
    pub fn read(&self) -> Result<ArchivedState, ArchiveError> {
        let path = self.state_path();
        if !path.is_file() {
            return Err(ArchiveError::Missing(path));
        }
        let contents = fs::read_to_string(&path)?;
        serde_json::from_str(&contents).map_err(|source| ArchiveError::Parse { path, source })
    }

    /// Check version, checksums and snapshot consistency
    pub fn validate(&self, state: &ArchivedState) -> Result<(), ArchiveError> {
        if state.version != ARCHIVE_VERSION {
            return Err(ArchiveError::UnsupportedVersion(state.version));
        }

        if self.verify_checksums {
            let actual = checksums(&state.snapshot)?;
            for (component, expected) in &state.checksums {
                let current = actual.get(component).cloned().unwrap_or_default();
                if current != *expected {
                    return Err(ArchiveError::ChecksumMismatch {
                        component: component.clone(),
                        expected: expected.clone(),
                        actual: current,
                    });
                }
            }
            if !state.checksums.contains_key(OVERALL_KEY) {
                return Err(ArchiveError::ChecksumMismatch {
                    component: OVERALL_KEY.to_string(),
                    expected: String::new(),
                    actual: actual.get(OVERALL_KEY).cloned().unwrap_or_default(),
                });
            }
        }

        state.snapshot.validate()?;
        Ok(())
    }

    /// The archived snapshot, only if it passes validation
    pub fn load_validated(&self) -> Result<SessionSnapshot, ArchiveError> {
        let state = self.read()?;
        self.validate(&state)?;
        Ok(state.snapshot)
    }

    /// Convert the snapshot directory's enhanced tier into an archive
    pub fn migrate(&self, store: &SnapshotStore) -> Result<ArchivedState, ArchiveError> {
        let snapshot = store.load_enhanced()?;
        tracing::info!(from = %store.dir().display(), "Migrating snapshot into archive");
        self.save(&snapshot)
    }

    pub fn status(&self) -> ArchiveStatus {
        let backups = self.backups().len();
        let state = match self.read() {
            Ok(state) => state,
            Err(ArchiveError::Missing(_)) => {
                return ArchiveStatus {
                    present: false,
                    saved_at: None,
                    captured_at: None,
                    workspaces: 0,
                    windows: 0,
                    assignments: 0,
                    valid: None,
                    problem: None,
                    backups,
                }
            }
            Err(e) => {
                return ArchiveStatus {
                    present: true,
                    saved_at: None,
                    captured_at: None,
                    workspaces: 0,
                    windows: 0,
                    assignments: 0,
                    valid: Some(false),
                    problem: Some(e.to_string()),
                    backups,
                }
            }
        };

        let check = self.validate(&state);
        ArchiveStatus {
            present: true,
            saved_at: Some(state.saved_at),
            captured_at: Some(state.snapshot.timestamp),
            workspaces: state.snapshot.workspaces.len(),
            windows: state.snapshot.windows.len(),
            assignments: state.snapshot.application_map.len(),
            valid: Some(check.is_ok()),
            problem: check.err().map(|e| e.to_string()),
            backups,
        }
    }

    /// Backup files, oldest first
    pub fn backups(&self) -> Vec<PathBuf> {
        let Ok(entries) = fs::read_dir(self.backup_dir()) else {
            return Vec::new();
        };
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();
        paths
    }

    fn rotate_backup(&self) -> Result<(), ArchiveError> {
        let backup_dir = self.backup_dir();
        fs::create_dir_all(&backup_dir)?;

        let stamp = self
            .read()
            .map(|state| state.saved_at)
            .unwrap_or_else(|_| Utc::now())
            .format("%Y%m%dT%H%M%S%.6fZ")
            .to_string();
        let target = unique_backup_path(&backup_dir, &stamp);
        fs::copy(self.state_path(), &target)?;
        tracing::debug!(backup = %target.display(), "Rotated previous archive");

        let backups = self.backups();
        if backups.len() > self.max_backups {
            for old in &backups[..backups.len() - self.max_backups] {
                if let Err(e) = fs::remove_file(old) {
                    tracing::warn!(path = %old.display(), error = %e, "Failed to prune backup");
                }
            }
        }
        Ok(())
    }
}

/// `state-<stamp>-<nnnn>.json`. The stamp has a fixed width and the counter
/// is zero-padded, so name order is (stamp, counter) order.
fn unique_backup_path(dir: &Path, stamp: &str) -> PathBuf {
    let mut n = 0u32;
    loop {
        let candidate = dir.join(format!("state-{}-{:04}.json", stamp, n));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

fn digest<T: Serialize + ?Sized>(value: &T) -> Result<String, ArchiveError> {
    let bytes = serde_json::to_vec(value).map_err(ArchiveError::Serialize)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Per-component and overall checksums of a snapshot
pub fn checksums(snapshot: &SessionSnapshot) -> Result<BTreeMap<String, String>, ArchiveError> {
    let mut sums = BTreeMap::new();
    sums.insert(WORKSPACES_KEY.to_string(), digest(&snapshot.workspaces)?);
    sums.insert(WINDOWS_KEY.to_string(), digest(&snapshot.windows)?);
    sums.insert(ASSIGNMENTS_KEY.to_string(), digest(&snapshot.application_map)?);
    sums.insert(OVERALL_KEY.to_string(), digest(snapshot)?);
    Ok(sums)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::models::fixtures::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_then_load_validated() {
        let dir = tempdir().unwrap();
        let archive = StateArchive::new(dir.path());
        let snapshot = main_web_snapshot();

        let state = archive.save(&snapshot).unwrap();
        assert_eq!(state.checksums.len(), 4);
        assert_eq!(archive.load_validated().unwrap(), snapshot);
    }

    #[test]
    fn test_tampered_component_fails_checksum() {
        let dir = tempdir().unwrap();
        let archive = StateArchive::new(dir.path());
        archive.save(&main_web_snapshot()).unwrap();

        let mut state = archive.read().unwrap();
        state.snapshot.windows[0].title = "edited".to_string();
        fs::write(
            archive.state_path(),
            serde_json::to_string(&state).unwrap(),
        )
        .unwrap();

        match archive.load_validated() {
            Err(ArchiveError::ChecksumMismatch { component, .. }) => {
                assert_eq!(component, "windows")
            }
            other => panic!("expected checksum mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_checksums_can_be_disabled() {
        let dir = tempdir().unwrap();
        let config = ArchiveConfig {
            max_backups: 3,
            verify_checksums: false,
        };
        let archive = StateArchive::from_config(dir.path(), &config);
        archive.save(&main_web_snapshot()).unwrap();

        let mut state = archive.read().unwrap();
        state.checksums.clear();
        fs::write(archive.state_path(), serde_json::to_string(&state).unwrap()).unwrap();

        assert!(archive.load_validated().is_ok());
    }

    #[test]
    fn test_inconsistent_snapshot_is_rejected_even_with_valid_checksums() {
        let dir = tempdir().unwrap();
        let archive = StateArchive::new(dir.path());
        let mut snapshot = main_web_snapshot();
        snapshot.windows.push(window("0x9", "mpv", 42));
        archive.save(&snapshot).unwrap();

        assert!(matches!(
            archive.load_validated(),
            Err(ArchiveError::Snapshot(SnapshotError::DanglingWindow { .. }))
        ));
    }

    #[test]
    fn test_garbage_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let archive = StateArchive::new(dir.path());
        fs::write(archive.state_path(), "{\"version\": 1").unwrap();
        assert!(matches!(
            archive.load_validated(),
            Err(ArchiveError::Parse { .. })
        ));
        assert_eq!(archive.status().valid, Some(false));
    }

    #[test]
    fn test_backups_are_rotated_and_pruned() {
        let dir = tempdir().unwrap();
        let config = ArchiveConfig {
            max_backups: 2,
            verify_checksums: true,
        };
        let archive = StateArchive::from_config(dir.path(), &config);
        for _ in 0..5 {
            archive.save(&main_web_snapshot()).unwrap();
        }

        assert_eq!(archive.backups().len(), 2);
        assert!(archive.load_validated().is_ok());
    }

    #[test]
    fn test_migrate_from_snapshot_directory() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("session-state"));
        store.save(&main_web_snapshot()).unwrap();
        let archive = StateArchive::new(dir.path().join("archive"));

        let state = archive.migrate(&store).unwrap();
        assert_eq!(state.snapshot, main_web_snapshot());
        assert!(archive.exists());
    }

    #[test]
    fn test_migrate_without_snapshot_fails() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("session-state"));
        let archive = StateArchive::new(dir.path().join("archive"));

        assert!(archive.migrate(&store).is_err());
        assert!(!archive.exists());
    }

    #[test]
    fn test_status() {
        let dir = tempdir().unwrap();
        let archive = StateArchive::new(dir.path());
        let empty = archive.status();
        assert!(!empty.present);
        assert_eq!(empty.valid, None);

        archive.save(&main_web_snapshot()).unwrap();
        let status = archive.status();
        assert!(status.present);
        assert_eq!(status.valid, Some(true));
        assert_eq!(status.workspaces, 2);
        assert_eq!(status.windows, 3);
        assert_eq!(status.assignments, 2);
        assert_eq!(status.backups, 0);
    }

    #[test]
    fn test_same_stamp_backups_sort_in_creation_order() {
        let dir = tempdir().unwrap();
        let archive = StateArchive::new(dir.path());
        fs::create_dir_all(archive.backup_dir()).unwrap();

        let mut created = Vec::new();
        for i in 0..3 {
            let path = unique_backup_path(&archive.backup_dir(), "20260101T120000.000000Z");
            fs::write(&path, i.to_string()).unwrap();
            created.push(path);
        }
        assert_eq!(archive.backups(), created);
    }

    #[test]
    fn test_pruning_keeps_newest_backup_with_colliding_stamp() {
        let dir = tempdir().unwrap();
        let config = ArchiveConfig {
            max_backups: 1,
            verify_checksums: true,
        };
        let archive = StateArchive::from_config(dir.path(), &config);
        let fixed = Utc::now();
        let pin_saved_at = || {
            let mut state = archive.read().unwrap();
            state.saved_at = fixed;
            fs::write(archive.state_path(), serde_json::to_string(&state).unwrap()).unwrap();
        };

        archive.save(&main_web_snapshot()).unwrap();
        pin_saved_at();
        archive.save(&main_web_snapshot()).unwrap();
        pin_saved_at();
        let mut newest = main_web_snapshot();
        newest.windows.truncate(1);
        // Rotates a backup whose stamp collides with the one already kept
        archive.save(&newest).unwrap();

        let backups = archive.backups();
        assert_eq!(backups.len(), 1);
        assert!(backups[0].to_string_lossy().ends_with("-0001.json"));
    }
}
