use std::fmt;

use crate::hooks::HookReport;
use crate::launch::{LaunchOutcome, RestorationAttempt};

use super::Phase;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreStatus {
    Full,
    Partial,
}

impl RestoreStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RestoreStatus::Full => "full",
            RestoreStatus::Partial => "partial",
        }
    }
}

/// Live counts gathered by the Validation phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCounts {
    pub expected: usize,
    pub actual: usize,
}

/// End-of-run report of a restore
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreSummary {
    /// Name of the tier that was replayed
    pub mode: &'static str,
    /// Phases entered, in order
    pub phases: Vec<Phase>,
    pub workspaces_expected: usize,
    pub workspaces_created: usize,
    /// Expected workspaces present when Validation ran
    pub workspaces_live: Option<usize>,
    pub attempts: Vec<RestorationAttempt>,
    pub windows: Option<WindowCounts>,
    pub windows_positioned: usize,
    pub windows_unmatched: usize,
    pub hooks: HookReport,
    /// Set when the run was interrupted
    pub cancelled: bool,
}

impl RestoreSummary {
    pub fn new(mode: &'static str) -> Self {
        Self {
            mode,
            phases: Vec::new(),
            workspaces_expected: 0,
            workspaces_created: 0,
            workspaces_live: None,
            attempts: Vec::new(),
            windows: None,
            windows_positioned: 0,
            windows_unmatched: 0,
            hooks: HookReport::default(),
            cancelled: false,
        }
    }

    pub fn apps_expected(&self) -> usize {
        self.attempts.len()
    }

    pub fn apps_restored(&self) -> usize {
        self.count(LaunchOutcome::is_restored)
    }

    pub fn apps_spawned(&self) -> usize {
        self.count(LaunchOutcome::was_spawned)
    }

    pub fn apps_timed_out(&self) -> usize {
        self.count(|o| *o == LaunchOutcome::TimedOut)
    }

    pub fn apps_failed(&self) -> usize {
        self.count(|o| *o == LaunchOutcome::Failed)
    }

    fn count(&self, pred: impl Fn(&LaunchOutcome) -> bool) -> usize {
        self.attempts.iter().filter(|a| pred(&a.outcome)).count()
    }

    /// Full when every workspace and application came back and at least as
    /// many windows are live as were recorded. Hook failures do not count.
    pub fn status(&self) -> RestoreStatus {
        let windows_ok = self.windows.map_or(true, |w| w.actual >= w.expected);
        if self.workspaces_created >= self.workspaces_expected
            && self.apps_restored() == self.apps_expected()
            && windows_ok
            && !self.cancelled
        {
            RestoreStatus::Full
        } else {
            RestoreStatus::Partial
        }
    }

    /// Something was expected, yet no workspace was created and nothing was spawned
    pub fn is_total_failure(&self) -> bool {
        let expected = self.workspaces_expected + self.apps_expected();
        expected > 0 && self.workspaces_created == 0 && self.apps_spawned() == 0
    }
}

impl fmt::Display for RestoreSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Restore mode: {}", self.mode)?;
        writeln!(
            f,
            "Workspaces: {}/{} created",
            self.workspaces_created, self.workspaces_expected
        )?;
        write!(
            f,
            "Applications: {}/{} restored",
            self.apps_restored(),
            self.apps_expected()
        )?;
        if self.apps_timed_out() > 0 || self.apps_failed() > 0 {
            write!(
                f,
                " ({} timed out, {} failed)",
                self.apps_timed_out(),
                self.apps_failed()
            )?;
        }
        writeln!(f)?;
        if let Some(windows) = self.windows {
            writeln!(
                f,
                "Windows: expected={}, actual={} ({} positioned, {} unmatched)",
                windows.expected, windows.actual, self.windows_positioned, self.windows_unmatched
            )?;
        }
        if self.hooks.ran > 0 {
            writeln!(
                f,
                "Hooks: {}/{} succeeded",
                self.hooks.succeeded(),
                self.hooks.ran
            )?;
        }
        if self.cancelled {
            writeln!(f, "Interrupted before completion")?;
        }
        write!(f, "Status: {}", self.status().as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(outcome: LaunchOutcome) -> RestorationAttempt {
        RestorationAttempt {
            application_class: "kitty".into(),
            target_workspace_id: Some(1),
            outcome,
        }
    }

    #[test]
    fn test_nothing_expected_is_full() {
        let mut summary = RestoreSummary::new("enhanced");
        summary.windows = Some(WindowCounts {
            expected: 0,
            actual: 0,
        });
        assert_eq!(summary.status(), RestoreStatus::Full);
        assert!(!summary.is_total_failure());
    }

    #[test]
    fn test_timed_out_app_is_partial_but_not_total_failure() {
        let mut summary = RestoreSummary::new("enhanced");
        summary.attempts = vec![attempt(LaunchOutcome::TimedOut)];
        assert_eq!(summary.status(), RestoreStatus::Partial);
        assert!(!summary.is_total_failure());
    }

    #[test]
    fn test_total_failure() {
        let mut summary = RestoreSummary::new("traditional");
        summary.attempts = vec![
            attempt(LaunchOutcome::Failed),
            attempt(LaunchOutcome::Failed),
        ];
        assert!(summary.is_total_failure());
    }

    #[test]
    fn test_hook_failures_do_not_downgrade_status() {
        let mut summary = RestoreSummary::new("enhanced");
        summary.attempts = vec![attempt(LaunchOutcome::LaunchedDirect)];
        summary.hooks = HookReport {
            ran: 1,
            failures: vec![("firefox".into(), "exit 1".into())],
        };
        assert_eq!(summary.status(), RestoreStatus::Full);
    }

    #[test]
    fn test_display() {
        let mut summary = RestoreSummary::new("enhanced");
        summary.workspaces_expected = 2;
        summary.workspaces_created = 2;
        summary.attempts = vec![
            attempt(LaunchOutcome::LaunchedDirect),
            attempt(LaunchOutcome::TimedOut),
        ];
        summary.windows = Some(WindowCounts {
            expected: 3,
            actual: 2,
        });
        let text = summary.to_string();
        assert!(text.contains("Restore mode: enhanced"));
        assert!(text.contains("Workspaces: 2/2 created"));
        assert!(text.contains("Applications: 1/2 restored (1 timed out, 0 failed)"));
        assert!(text.contains("expected=3, actual=2"));
        assert!(text.ends_with("Status: partial"));
    }
}
