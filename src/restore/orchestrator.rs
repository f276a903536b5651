//! Restoration phase state machine
//!
//! Replays a snapshot through a fixed sequence of phases. Phases never
//! branch back, and a failure inside one is counted and logged without
//! stopping the phases after it.

use std::path::PathBuf;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::compositor::{Compositor, CompositorCommand};
use crate::config::RestoreConfig;
use crate::hooks::{HookMode, HookRunner};
use crate::launch::{CapabilityTable, Launcher, RestorationAttempt, WaitPolicy};
use crate::snapshot::{SessionSnapshot, TraditionalEntry};

use super::fallback::RestoreMode;
use super::positioning::{placement_commands, WindowMatcher};
use super::summary::{RestoreSummary, WindowCounts};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Idle,
    WorkspaceRecreation,
    ApplicationLaunch,
    InitializationWait,
    WindowPositioning,
    FocusRestoration,
    HookExecution,
    Validation,
    Done,
}

impl Phase {
    /// Phases replayed for a structured snapshot
    pub const ENHANCED_PATH: [Phase; 7] = [
        Phase::WorkspaceRecreation,
        Phase::ApplicationLaunch,
        Phase::InitializationWait,
        Phase::WindowPositioning,
        Phase::FocusRestoration,
        Phase::HookExecution,
        Phase::Validation,
    ];

    /// Phases replayed for a flat application list
    pub const TRADITIONAL_PATH: [Phase; 2] = [Phase::ApplicationLaunch, Phase::HookExecution];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::WorkspaceRecreation => "workspace-recreation",
            Phase::ApplicationLaunch => "application-launch",
            Phase::InitializationWait => "initialization-wait",
            Phase::WindowPositioning => "window-positioning",
            Phase::FocusRestoration => "focus-restoration",
            Phase::HookExecution => "hook-execution",
            Phase::Validation => "validation",
            Phase::Done => "done",
        }
    }
}

pub struct RestoreOrchestrator<'a> {
    compositor: &'a dyn Compositor,
    capabilities: &'a CapabilityTable,
    hooks: &'a HookRunner,
    session_dir: PathBuf,
    config: RestoreConfig,
    cancel: CancellationToken,
}

impl<'a> RestoreOrchestrator<'a> {
    pub fn new(
        compositor: &'a dyn Compositor,
        capabilities: &'a CapabilityTable,
        hooks: &'a HookRunner,
        session_dir: impl Into<PathBuf>,
        config: RestoreConfig,
    ) -> Self {
        Self {
            compositor,
            capabilities,
            hooks,
            session_dir: session_dir.into(),
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop waiting and launching once `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Replay `mode` to completion
    pub async fn run(&self, mode: &RestoreMode) -> RestoreSummary {
        let summary = match mode {
            RestoreMode::Alternate(snapshot) | RestoreMode::Enhanced(snapshot) => {
                self.run_enhanced(mode.name(), snapshot).await
            }
            RestoreMode::Traditional(entries) => self.run_traditional(entries).await,
            RestoreMode::Unavailable => {
                let mut summary = RestoreSummary::new(mode.name());
                summary.phases = vec![Phase::Idle, Phase::Done];
                summary
            }
        };

        tracing::info!(
            mode = summary.mode,
            status = summary.status().as_str(),
            workspaces = %format!("{}/{}", summary.workspaces_created, summary.workspaces_expected),
            applications = %format!("{}/{}", summary.apps_restored(), summary.apps_expected()),
            "Restore finished"
        );
        summary
    }

    async fn run_enhanced(&self, name: &'static str, snapshot: &SessionSnapshot) -> RestoreSummary {
        let mut summary = RestoreSummary::new(name);
        summary.phases.push(Phase::Idle);
        summary.workspaces_expected = snapshot.workspaces.len();
        summary.attempts = snapshot
            .application_map
            .iter()
            .map(RestorationAttempt::pending)
            .collect();

        for phase in Phase::ENHANCED_PATH {
            enter(phase, &mut summary);
            match phase {
                Phase::WorkspaceRecreation => self.recreate_workspaces(snapshot, &mut summary).await,
                Phase::ApplicationLaunch => self.launch_assignments(snapshot, &mut summary).await,
                Phase::InitializationWait => self.settle().await,
                Phase::WindowPositioning => self.position_windows(snapshot, &mut summary).await,
                Phase::FocusRestoration => self.restore_focus(snapshot).await,
                Phase::HookExecution => {
                    summary.hooks = self
                        .hooks
                        .run_all(HookMode::PostRestore, &self.session_dir)
                        .await
                }
                Phase::Validation => self.validate(snapshot, &mut summary).await,
                Phase::Idle | Phase::Done => {}
            }
        }

        summary.cancelled = self.cancel.is_cancelled();
        enter(Phase::Done, &mut summary);
        summary
    }

    async fn run_traditional(&self, entries: &[TraditionalEntry]) -> RestoreSummary {
        let mut summary = RestoreSummary::new("traditional");
        summary.phases.push(Phase::Idle);
        summary.attempts = entries
            .iter()
            .map(RestorationAttempt::pending_traditional)
            .collect();

        for phase in Phase::TRADITIONAL_PATH {
            enter(phase, &mut summary);
            match phase {
                Phase::ApplicationLaunch => {
                    let launcher = self.launcher();
                    for (idx, entry) in entries.iter().enumerate() {
                        if idx > 0 && !self.pause(self.config.launch_delay).await {
                            break;
                        }
                        summary.attempts[idx].outcome = launcher.launch_on_current(entry).await;
                    }
                }
                Phase::HookExecution => {
                    summary.hooks = self
                        .hooks
                        .run_all(HookMode::PostRestore, &self.session_dir)
                        .await
                }
                _ => {}
            }
        }

        summary.cancelled = self.cancel.is_cancelled();
        enter(Phase::Done, &mut summary);
        summary
    }

    /// Ensure every workspace exists, ascending by id, and apply its name
    async fn recreate_workspaces(&self, snapshot: &SessionSnapshot, summary: &mut RestoreSummary) {
        let mut layouts: Vec<_> = snapshot.workspaces.iter().collect();
        layouts.sort_by_key(|ws| ws.id);

        for layout in layouts {
            if let Err(e) = self
                .compositor
                .dispatch(&CompositorCommand::SwitchWorkspace(layout.id))
                .await
            {
                tracing::warn!(workspace = layout.id, error = %e, "Failed to create workspace");
                continue;
            }
            summary.workspaces_created += 1;

            if let Some(name) = layout.name.as_ref().filter(|n| **n != layout.id.to_string()) {
                let rename = CompositorCommand::RenameWorkspace {
                    id: layout.id,
                    name: name.clone(),
                };
                if let Err(e) = self.compositor.dispatch(&rename).await {
                    tracing::warn!(workspace = layout.id, name = %name, error = %e, "Failed to name workspace");
                }
            }
        }
    }

    async fn launch_assignments(&self, snapshot: &SessionSnapshot, summary: &mut RestoreSummary) {
        let launcher = self.launcher();
        for (idx, assignment) in snapshot.application_map.iter().enumerate() {
            if idx > 0 && !self.pause(self.config.launch_delay).await {
                break;
            }
            let outcome = launcher.launch(assignment).await;
            tracing::info!(
                class = %assignment.application_class,
                workspace = assignment.target_workspace_id,
                outcome = outcome.as_str(),
                "Application launch"
            );
            summary.attempts[idx].outcome = outcome;
        }
    }

    async fn settle(&self) {
        self.pause(self.config.settle_delay).await;
    }

    async fn position_windows(&self, snapshot: &SessionSnapshot, summary: &mut RestoreSummary) {
        let live = match self.compositor.clients().await {
            Ok(live) => live,
            Err(e) => {
                tracing::warn!(error = %e, "Client query failed, no windows can be positioned");
                summary.windows_unmatched = snapshot.windows.len();
                return;
            }
        };

        let mut matcher = WindowMatcher::new(&live);
        for wanted in &snapshot.windows {
            let Some(found) = matcher.claim(wanted) else {
                tracing::debug!(class = %wanted.application_class, title = %wanted.title, "No live window to position");
                summary.windows_unmatched += 1;
                continue;
            };

            let mut placed = true;
            for (idx, command) in placement_commands(wanted, found).iter().enumerate() {
                if let Err(e) = self.compositor.dispatch(command).await {
                    tracing::warn!(command = %command.describe(), error = %e, "Positioning command failed");
                    if idx == 0 {
                        placed = false;
                        break;
                    }
                }
            }
            if placed {
                summary.windows_positioned += 1;
            } else {
                summary.windows_unmatched += 1;
            }
        }
    }

    async fn restore_focus(&self, snapshot: &SessionSnapshot) {
        let Some(id) = snapshot.active_workspace_id else {
            tracing::debug!("No active workspace recorded");
            return;
        };
        if let Err(e) = self
            .compositor
            .dispatch(&CompositorCommand::SwitchWorkspace(id))
            .await
        {
            tracing::warn!(workspace = id, error = %e, "Failed to restore focus");
        }
    }

    async fn validate(&self, snapshot: &SessionSnapshot, summary: &mut RestoreSummary) {
        match self.compositor.workspaces().await {
            Ok(live) => {
                let present = snapshot
                    .workspaces
                    .iter()
                    .filter(|ws| live.iter().any(|l| l.id == ws.id))
                    .count();
                summary.workspaces_live = Some(present);
            }
            Err(e) => tracing::warn!(error = %e, "Workspace query failed during validation"),
        }

        let actual = match self.compositor.clients().await {
            Ok(live) => live.len(),
            Err(e) => {
                tracing::warn!(error = %e, "Client query failed during validation");
                0
            }
        };
        summary.windows = Some(WindowCounts {
            expected: snapshot.windows.len(),
            actual,
        });
    }

    fn launcher(&self) -> Launcher<'_, dyn Compositor + 'a> {
        Launcher::new(
            self.compositor,
            self.capabilities,
            WaitPolicy {
                attempts: self.config.window_poll_attempts,
                interval: self.config.window_poll_interval,
            },
            self.cancel.clone(),
        )
    }

    /// Sleep unless cancelled; false when cancelled
    async fn pause(&self, delay: Duration) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        if delay.is_zero() {
            return true;
        }
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }
}

fn enter(phase: Phase, summary: &mut RestoreSummary) {
    tracing::info!(phase = phase.as_str(), "Entering restore phase");
    summary.phases.push(phase);
}
