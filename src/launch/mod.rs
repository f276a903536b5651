//! Workspace-aware application launching
//!
//! An application is first spawned pre-bound to its target workspace. When
//! the compositor rejects that, or the class is known not to honour it, the
//! launcher switches to the workspace and spawns there instead, without
//! switching back. Either way it then polls for a new window of the class
//! for a bounded number of attempts.

pub mod capabilities;

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::compositor::{Compositor, CompositorCommand, CompositorError};
use crate::snapshot::{ApplicationWorkspaceAssignment, TraditionalEntry, WorkspaceId};

pub use capabilities::{Capability, CapabilityTable, CAPABILITIES_FILE};

/// Result of launching one assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// Not attempted (run cancelled first)
    Pending,
    LaunchedDirect,
    LaunchedFallback,
    /// Spawned, but no window showed up within the poll bound
    TimedOut,
    /// The spawn itself failed
    Failed,
}

impl LaunchOutcome {
    /// A window for the application is known to exist
    pub fn is_restored(&self) -> bool {
        matches!(self, LaunchOutcome::LaunchedDirect | LaunchOutcome::LaunchedFallback)
    }

    /// A spawn was issued, whether or not its window appeared
    pub fn was_spawned(&self) -> bool {
        self.is_restored() || *self == LaunchOutcome::TimedOut
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LaunchOutcome::Pending => "pending",
            LaunchOutcome::LaunchedDirect => "launched-direct",
            LaunchOutcome::LaunchedFallback => "launched-fallback",
            LaunchOutcome::TimedOut => "timed-out",
            LaunchOutcome::Failed => "failed",
        }
    }
}

/// Launch status of one application during a restore run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestorationAttempt {
    pub application_class: String,
    /// None when launched onto whatever workspace is current
    pub target_workspace_id: Option<WorkspaceId>,
    pub outcome: LaunchOutcome,
}

impl RestorationAttempt {
    pub fn pending(assignment: &ApplicationWorkspaceAssignment) -> Self {
        Self {
            application_class: assignment.application_class.clone(),
            target_workspace_id: Some(assignment.target_workspace_id),
            outcome: LaunchOutcome::Pending,
        }
    }

    pub fn pending_traditional(entry: &TraditionalEntry) -> Self {
        Self {
            application_class: entry.application_class.clone(),
            target_workspace_id: None,
            outcome: LaunchOutcome::Pending,
        }
    }
}

/// How long and how often to look for a launched application's window
#[derive(Debug, Clone, Copy)]
pub struct WaitPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitResult {
    Appeared,
    TimedOut,
    Cancelled,
}

/// Count mapped windows of `class`, case-insensitively
pub async fn count_windows<C: Compositor + ?Sized>(
    compositor: &C,
    class: &str,
) -> Result<usize, CompositorError> {
    let clients = compositor.clients().await?;
    Ok(clients
        .iter()
        .filter(|w| w.class.eq_ignore_ascii_case(class))
        .count())
}

/// Poll until more than `baseline` windows of `class` are mapped.
///
/// Makes exactly `policy.attempts` queries, each preceded by one interval,
/// unless the window appears or the token is cancelled first. Query
/// failures count as a miss.
pub async fn wait_for_window<C: Compositor + ?Sized>(
    compositor: &C,
    class: &str,
    baseline: usize,
    policy: WaitPolicy,
    cancel: &CancellationToken,
) -> WaitResult {
    for attempt in 1..=policy.attempts {
        tokio::select! {
            _ = cancel.cancelled() => return WaitResult::Cancelled,
            _ = tokio::time::sleep(policy.interval) => {}
        }

        match count_windows(compositor, class).await {
            Ok(count) if count > baseline => {
                tracing::debug!(class = %class, attempt, "Window appeared");
                return WaitResult::Appeared;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(class = %class, attempt, error = %e, "Window poll failed");
            }
        }
    }
    WaitResult::TimedOut
}

/// Spawns applications and waits for their windows
pub struct Launcher<'a, C: Compositor + ?Sized> {
    compositor: &'a C,
    capabilities: &'a CapabilityTable,
    policy: WaitPolicy,
    cancel: CancellationToken,
}

impl<'a, C: Compositor + ?Sized> Launcher<'a, C> {
    pub fn new(
        compositor: &'a C,
        capabilities: &'a CapabilityTable,
        policy: WaitPolicy,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            compositor,
            capabilities,
            policy,
            cancel,
        }
    }

    /// Launch an assignment onto its target workspace
    pub async fn launch(&self, assignment: &ApplicationWorkspaceAssignment) -> LaunchOutcome {
        if self.cancel.is_cancelled() {
            return LaunchOutcome::Pending;
        }

        let class = assignment.application_class.as_str();
        let workspace_id = assignment.target_workspace_id;
        let command = if assignment.launch_command.trim().is_empty() {
            self.capabilities.launch_command(class, workspace_id)
        } else {
            assignment.launch_command.clone()
        };
        let baseline = self.baseline(class).await;

        let mut direct = false;
        if self.capabilities.supports_direct_launch(class) {
            let spawn = CompositorCommand::ExecOnWorkspace {
                command: command.clone(),
                workspace_id,
            };
            match self.compositor.dispatch(&spawn).await {
                Ok(()) => direct = true,
                Err(CompositorError::Rejected { reply, .. }) => {
                    tracing::info!(
                        class = %class,
                        workspace = workspace_id,
                        reply = %reply,
                        "Direct workspace launch rejected, switching first"
                    );
                }
                Err(e) => {
                    tracing::warn!(class = %class, workspace = workspace_id, error = %e, "Launch failed");
                    return LaunchOutcome::Failed;
                }
            }
        }

        if !direct {
            if let Err(e) = self
                .compositor
                .dispatch(&CompositorCommand::SwitchWorkspace(workspace_id))
                .await
            {
                tracing::warn!(workspace = workspace_id, error = %e, "Failed to switch workspace before launch");
            }
            if let Err(e) = self
                .compositor
                .dispatch(&CompositorCommand::Exec { command })
                .await
            {
                tracing::warn!(class = %class, workspace = workspace_id, error = %e, "Launch failed");
                return LaunchOutcome::Failed;
            }
        }

        let launched = if direct {
            LaunchOutcome::LaunchedDirect
        } else {
            LaunchOutcome::LaunchedFallback
        };
        self.await_window(class, baseline, launched).await
    }

    /// Launch onto whatever workspace is current
    pub async fn launch_on_current(&self, entry: &TraditionalEntry) -> LaunchOutcome {
        if self.cancel.is_cancelled() {
            return LaunchOutcome::Pending;
        }

        let class = entry.application_class.as_str();
        let baseline = self.baseline(class).await;
        let spawn = CompositorCommand::Exec {
            command: entry.launch_command.clone(),
        };
        if let Err(e) = self.compositor.dispatch(&spawn).await {
            tracing::warn!(class = %class, error = %e, "Launch failed");
            return LaunchOutcome::Failed;
        }
        self.await_window(class, baseline, LaunchOutcome::LaunchedFallback)
            .await
    }

    async fn baseline(&self, class: &str) -> usize {
        match count_windows(self.compositor, class).await {
            Ok(count) => count,
            Err(e) => {
                tracing::debug!(class = %class, error = %e, "Could not count existing windows");
                0
            }
        }
    }

    async fn await_window(
        &self,
        class: &str,
        baseline: usize,
        launched: LaunchOutcome,
    ) -> LaunchOutcome {
        match wait_for_window(self.compositor, class, baseline, self.policy, &self.cancel).await {
            WaitResult::Appeared => launched,
            WaitResult::TimedOut => {
                tracing::warn!(
                    class = %class,
                    attempts = self.policy.attempts,
                    "No window appeared for launched application"
                );
                LaunchOutcome::TimedOut
            }
            WaitResult::Cancelled => LaunchOutcome::TimedOut,
        }
    }
}
