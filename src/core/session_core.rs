//! Shared wiring behind every command

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::archive::{ArchiveStatus, ArchivedState, ArchiveError, StateArchive};
use crate::capture::{CaptureError, CaptureOrchestrator, CaptureReport};
use crate::compositor::Compositor;
use crate::config::Config;
use crate::hooks::HookRunner;
use crate::launch::CapabilityTable;
use crate::restore::{Decision, FallbackManager, RestoreOrchestrator, RestoreSummary, Tier};
use crate::snapshot::{SnapshotError, SnapshotStore};
use crate::util;

/// Owns the stores, hooks and capability table for one data directory.
///
/// Compositor access is passed into each operation so the same core drives
/// a live Hyprland session or a mock.
pub struct SessionCore {
    config: Config,
    store: SnapshotStore,
    archive: StateArchive,
    hooks: HookRunner,
    capabilities: CapabilityTable,
    cancel: CancellationToken,
}

/// Result of a restore command
#[derive(Debug, Clone)]
pub struct RestoreOutcome {
    pub decision: Decision,
    pub summary: RestoreSummary,
}

impl RestoreOutcome {
    /// Exit non-zero: nothing to restore, or nothing restored at all
    pub fn is_failure(&self) -> bool {
        !self.decision.mode.is_available() || self.summary.is_total_failure()
    }
}

/// Tally of an auto-save run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AutoSaveReport {
    pub saves: usize,
    pub failures: usize,
}

/// Everything `status` reports
#[derive(Debug, Clone)]
pub struct SessionStatus {
    pub snapshot_dir: PathBuf,
    pub present: bool,
    pub captured_at: Option<DateTime<Utc>>,
    /// (workspaces, windows, assignments) or the reason the tier is unusable
    pub enhanced: Result<(usize, usize, usize), String>,
    pub traditional: Result<usize, String>,
    pub hook_dirs: Vec<String>,
    pub archive: ArchiveStatus,
    /// Tier a restore would use right now
    pub restore_tier: Option<Tier>,
}

impl SessionCore {
    /// Core rooted at `data_dir` using the standard layout under it
    pub fn new(config: Config, data_dir: &Path) -> Self {
        let hooks_dir = util::hooks_dir(data_dir);
        Self {
            store: SnapshotStore::new(util::session_state_dir(data_dir)),
            archive: StateArchive::from_config(util::archive_dir(data_dir), &config.archive),
            hooks: HookRunner::from_config(&hooks_dir, &config.hooks),
            capabilities: CapabilityTable::load(&config.applications, &hooks_dir),
            cancel: CancellationToken::new(),
            config,
        }
    }

    /// Core rooted at the initialized data directory
    pub fn open_default(config: Config) -> Self {
        Self::new(config, &util::data_dir())
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn archive(&self) -> &StateArchive {
        &self.archive
    }

    pub fn capabilities(&self) -> &CapabilityTable {
        &self.capabilities
    }

    /// Capture into the snapshot directory. An existing archive is
    /// refreshed too so it never trails the snapshot.
    pub async fn save(&self, compositor: &dyn Compositor) -> Result<CaptureReport, CaptureError> {
        let report = self.capture(compositor).await?;
        if self.archive.exists() {
            if let Err(e) = self.archive.save(&report.snapshot) {
                tracing::warn!(error = %e, "Failed to refresh archive after save");
            }
        }
        Ok(report)
    }

    /// Save every `interval` until cancelled. The first save happens
    /// immediately; a failed save is logged and the loop keeps going.
    pub async fn auto_save(
        &self,
        compositor: &dyn Compositor,
        interval: Duration,
    ) -> AutoSaveReport {
        let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut report = AutoSaveReport::default();
        tracing::info!(interval_secs = interval.as_secs(), "Auto-save started");

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    tracing::info!(saves = report.saves, failures = report.failures, "Auto-save stopped");
                    break;
                }
                _ = ticker.tick() => {
                    match self.save(compositor).await {
                        Ok(capture) => {
                            report.saves += 1;
                            tracing::debug!(windows = capture.snapshot.windows.len(), "Auto-save captured");
                        }
                        Err(e) => {
                            report.failures += 1;
                            tracing::warn!(error = %e, "Auto-save capture failed");
                        }
                    }
                }
            }
        }
        report
    }

    /// Capture into the snapshot directory and the archive
    pub async fn archive_save(
        &self,
        compositor: &dyn Compositor,
    ) -> Result<CaptureReport, CaptureError> {
        let report = self.capture(compositor).await?;
        self.archive.save(&report.snapshot)?;
        Ok(report)
    }

    async fn capture(&self, compositor: &dyn Compositor) -> Result<CaptureReport, CaptureError> {
        CaptureOrchestrator::new(compositor, &self.store, &self.hooks, &self.capabilities)
            .capture()
            .await
    }

    /// Tier decision for the current on-disk state
    pub fn decide(&self, prefer: Option<Tier>) -> Decision {
        let manager = FallbackManager::new(&self.store, &self.archive, &self.config.restore.tier_order);
        match prefer {
            Some(tier) => manager.preferring(tier).decide(),
            None => manager.decide(),
        }
    }

    /// Decide what to replay and replay it
    pub async fn restore(&self, compositor: &dyn Compositor, prefer: Option<Tier>) -> RestoreOutcome {
        let decision = self.decide(prefer);
        let summary = RestoreOrchestrator::new(
            compositor,
            &self.capabilities,
            &self.hooks,
            self.store.dir(),
            self.config.restore.clone(),
        )
        .with_cancellation(self.cancel.clone())
        .run(&decision.mode)
        .await;
        RestoreOutcome { decision, summary }
    }

    pub fn clean(&self) -> Result<bool, SnapshotError> {
        self.store.clean()
    }

    pub fn archive_migrate(&self) -> Result<ArchivedState, ArchiveError> {
        self.archive.migrate(&self.store)
    }

    pub fn status(&self) -> SessionStatus {
        let enhanced = self
            .store
            .load_enhanced()
            .map(|s| (s.workspaces.len(), s.windows.len(), s.application_map.len()))
            .map_err(|e| e.to_string());
        let traditional = self
            .store
            .load_traditional()
            .map(|entries| entries.len())
            .map_err(|e| e.to_string());

        SessionStatus {
            snapshot_dir: self.store.dir().to_path_buf(),
            present: self.store.exists(),
            captured_at: self.store.read_timestamp(),
            enhanced,
            traditional,
            hook_dirs: self.store.app_dirs(),
            archive: self.archive.status(),
            restore_tier: self.decide(None).mode.tier(),
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Snapshot directory: {}", self.snapshot_dir.display())?;
        if !self.present {
            writeln!(f, "No saved session")?;
        } else {
            match self.captured_at {
                Some(ts) => writeln!(f, "Captured: {}", ts.to_rfc3339())?,
                None => writeln!(f, "Captured: unknown")?,
            }
            match &self.enhanced {
                Ok((ws, windows, apps)) => writeln!(
                    f,
                    "Enhanced: {} workspaces, {} windows, {} applications",
                    ws, windows, apps
                )?,
                Err(reason) => writeln!(f, "Enhanced: unusable ({})", reason)?,
            }
            match &self.traditional {
                Ok(count) => writeln!(f, "Traditional: {} applications", count)?,
                Err(reason) => writeln!(f, "Traditional: unusable ({})", reason)?,
            }
            if !self.hook_dirs.is_empty() {
                writeln!(f, "Hook data: {}", self.hook_dirs.join(", "))?;
            }
        }
        writeln!(f, "{}", ArchiveStatusLine(&self.archive))?;
        write!(
            f,
            "Restore would use: {}",
            self.restore_tier.map(|t| t.as_str()).unwrap_or("nothing")
        )
    }
}

/// One-line archive summary
pub struct ArchiveStatusLine<'a>(pub &'a ArchiveStatus);

impl fmt::Display for ArchiveStatusLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = self.0;
        if !status.present {
            return write!(f, "Archive: none");
        }
        match (status.valid, &status.problem) {
            (Some(true), _) => write!(
                f,
                "Archive: valid, {} workspaces, {} windows, {} applications, {} backups",
                status.workspaces, status.windows, status.assignments, status.backups
            ),
            (_, Some(problem)) => write!(f, "Archive: invalid ({})", problem),
            _ => write!(f, "Archive: invalid"),
        }
    }
}
