//! Capture orchestrator
//!
//! Turns live compositor state into a [`SessionSnapshot`] and persists it.
//! Every query is best-effort: a failing source contributes nothing and is
//! noted in the report, but never aborts the capture. The one exception is
//! a compositor that answered nothing at all while a usable snapshot is
//! already stored: that snapshot is kept instead of being replaced by an
//! empty one.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::Utc;
use thiserror::Error;

use crate::archive::ArchiveError;
use crate::compositor::{Compositor, LiveWindow, LiveWorkspace, Monitor};
use crate::hooks::{HookMode, HookReport, HookRunner};
use crate::launch::CapabilityTable;
use crate::snapshot::{
    derive_assignments, SessionSnapshot, SnapshotError, SnapshotStore, WindowState, WorkspaceId,
    WorkspaceLayout,
};

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Failed to persist snapshot: {0}")]
    Persist(#[from] SnapshotError),
    #[error("Failed to write archive: {0}")]
    Archive(#[from] ArchiveError),
    #[error("Every compositor query failed, keeping the previous snapshot")]
    NothingCaptured,
}

/// What a capture produced
#[derive(Debug, Clone)]
pub struct CaptureReport {
    pub snapshot: SessionSnapshot,
    /// Names of the queries that failed and were treated as empty
    pub query_failures: Vec<String>,
    pub hooks: HookReport,
}

/// monitors, workspaces, clients, activeworkspace
const QUERY_COUNT: usize = 4;

pub struct CaptureOrchestrator<'a> {
    compositor: &'a dyn Compositor,
    store: &'a SnapshotStore,
    hooks: &'a HookRunner,
    capabilities: &'a CapabilityTable,
}

impl<'a> CaptureOrchestrator<'a> {
    pub fn new(
        compositor: &'a dyn Compositor,
        store: &'a SnapshotStore,
        hooks: &'a HookRunner,
        capabilities: &'a CapabilityTable,
    ) -> Self {
        Self {
            compositor,
            store,
            hooks,
            capabilities,
        }
    }

    /// Query, run pre-save hooks, then replace the stored snapshot.
    ///
    /// Hooks and files are written to a staging directory; the previous
    /// snapshot is only replaced once all of it was written.
    pub async fn capture(&self) -> Result<CaptureReport, CaptureError> {
        let (snapshot, query_failures) = self.build_snapshot().await;

        if query_failures.len() == QUERY_COUNT && self.store.load_enhanced().is_ok() {
            tracing::warn!("Compositor answered no queries, previous snapshot left in place");
            return Err(CaptureError::NothingCaptured);
        }

        let staged = self.store.stage()?;
        let hooks = self.hooks.run_all(HookMode::PreSave, staged.dir()).await;
        staged.store().save(&snapshot)?;
        staged.commit()?;

        tracing::info!(
            workspaces = snapshot.workspaces.len(),
            windows = snapshot.windows.len(),
            assignments = snapshot.application_map.len(),
            query_failures = query_failures.len(),
            hook_failures = hooks.failed(),
            "Capture complete"
        );

        Ok(CaptureReport {
            snapshot,
            query_failures,
            hooks,
        })
    }

    /// Query the compositor and assemble a snapshot without persisting it
    pub async fn build_snapshot(&self) -> (SessionSnapshot, Vec<String>) {
        let mut failures = Vec::new();

        let monitors: Vec<Monitor> = match self.compositor.monitors().await {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(error = %e, "Monitor query failed, continuing without monitors");
                failures.push("monitors".to_string());
                Vec::new()
            }
        };
        let live_workspaces: Vec<LiveWorkspace> = match self.compositor.workspaces().await {
            Ok(w) => w,
            Err(e) => {
                tracing::warn!(error = %e, "Workspace query failed, continuing without workspaces");
                failures.push("workspaces".to_string());
                Vec::new()
            }
        };
        let clients: Vec<LiveWindow> = match self.compositor.clients().await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, "Client query failed, continuing without windows");
                failures.push("clients".to_string());
                Vec::new()
            }
        };
        let active_workspace = match self.compositor.active_workspace().await {
            Ok(active) => active.filter(|id| *id > 0),
            Err(e) => {
                tracing::warn!(error = %e, "Active workspace query failed");
                failures.push("activeworkspace".to_string());
                None
            }
        };

        let monitor_names: HashMap<i64, &str> =
            monitors.iter().map(|m| (m.id, m.name.as_str())).collect();

        let workspaces: Vec<WorkspaceLayout> = live_workspaces
            .iter()
            .filter(|ws| ws.id > 0)
            .map(|ws| WorkspaceLayout {
                id: ws.id,
                name: Some(ws.name.clone()).filter(|name| *name != ws.id.to_string()),
                monitor_name: ws.monitor.clone(),
                monitor_index: ws.monitor_id.unwrap_or(-1),
                window_count: ws.windows,
                has_fullscreen_window: ws.has_fullscreen,
            })
            .collect();

        let mut windows: Vec<WindowState> = clients
            .iter()
            .filter(|w| w.workspace_id > 0 && !w.class.is_empty())
            .map(|w| WindowState {
                address: w.address.clone(),
                application_class: w.class.clone(),
                title: w.title.clone(),
                workspace_id: w.workspace_id,
                position: w.position,
                size: w.size,
                floating: w.floating,
                fullscreen: w.fullscreen,
                pinned: w.pinned,
                monitor_name: monitor_names
                    .get(&w.monitor_id)
                    .map(|name| name.to_string())
                    .unwrap_or_default(),
                focused: w.is_focused(),
            })
            .collect();

        // A failed workspace query must not orphan every window
        let known: HashSet<WorkspaceId> = workspaces.iter().map(|ws| ws.id).collect();
        let mut synthesized: BTreeMap<WorkspaceId, WorkspaceLayout> = BTreeMap::new();
        for window in windows.iter().filter(|w| !known.contains(&w.workspace_id)) {
            synthesized
                .entry(window.workspace_id)
                .or_insert_with(|| WorkspaceLayout {
                    id: window.workspace_id,
                    name: None,
                    monitor_name: window.monitor_name.clone(),
                    monitor_index: -1,
                    window_count: 0,
                    has_fullscreen_window: false,
                })
                .window_count += 1;
        }
        if !synthesized.is_empty() {
            tracing::debug!(
                count = synthesized.len(),
                "Synthesized layouts for workspaces seen only through windows"
            );
        }
        let mut workspaces = workspaces;
        workspaces.extend(synthesized.into_values());

        windows.sort_by_key(|w| w.workspace_id);
        let assignments = derive_assignments(&windows, |class, workspace| {
            self.capabilities.launch_command(class, workspace)
        });

        let snapshot = SessionSnapshot::new(Utc::now(), workspaces, windows, assignments)
            .with_active_workspace(active_workspace)
            .with_monitors(monitors.iter().map(|m| m.name.clone()).collect());

        (snapshot, failures)
    }
}
