//! Bounded waiting and cancellation during application launch

use super::common::desktop::{fresh_desktop, quick_config, work_desktop, TestSession};
use hyprsession::compositor::{LiveWindow, MockApp, MockCompositor};
use hyprsession::launch::LaunchOutcome;
use hyprsession::restore::RestoreStatus;
use hyprsession::SessionCore;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

fn viewer_desktop() -> MockCompositor {
    MockCompositor::new()
        .with_monitor(0, "DP-1")
        .with_workspace(3, "docs", "DP-1")
        .with_window(LiveWindow::new("0xc", "zathura", 3))
}

/// A window that never maps costs a bounded number of polls, then the run moves on
#[tokio::test]
async fn test_missing_window_times_out_within_bound() {
    let session = TestSession::with_config(quick_config(3));
    session.core.save(&viewer_desktop()).await.unwrap();

    let target = fresh_desktop().with_app("zathura", MockApp::new("zathura").never_appearing());
    let started = Instant::now();
    let outcome = session.core.restore(&target, None).await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(outcome.summary.attempts[0].outcome, LaunchOutcome::TimedOut);
    assert_eq!(outcome.summary.status(), RestoreStatus::Partial);
    // Spawned but unseen still counts as an attempt that ran
    assert!(!outcome.is_failure());
    // Baseline, three polls, positioning and validation
    assert_eq!(target.client_queries(), 6);
}

/// A slow window is picked up as long as it maps within the poll budget
#[tokio::test]
async fn test_slow_window_within_budget_is_restored() {
    let session = TestSession::with_config(quick_config(5));
    session.core.save(&viewer_desktop()).await.unwrap();

    let target = fresh_desktop().with_app("zathura", MockApp::new("zathura").appearing_after(3));
    let outcome = session.core.restore(&target, None).await;

    assert!(outcome.summary.attempts[0].outcome.is_restored());
    assert_eq!(outcome.summary.status(), RestoreStatus::Full);
}

/// A spawn error is recorded and the remaining applications still launch
#[tokio::test]
async fn test_failed_spawn_does_not_stop_the_run() {
    let session = TestSession::new();
    session.core.save(&work_desktop()).await.unwrap();

    let target = fresh_desktop().with_app("kitty", MockApp::new("kitty").failing());
    let outcome = session.core.restore(&target, None).await;

    assert_eq!(outcome.summary.apps_failed(), 1);
    assert_eq!(outcome.summary.apps_restored(), 1);
    assert_eq!(target.live_windows().len(), 1);
}

/// Cancelling before launch leaves applications pending but still reports
#[tokio::test]
async fn test_cancelled_restore_reports_partial() {
    let session = TestSession::new();
    session.core.save(&work_desktop()).await.unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let core = SessionCore::new(hyprsession::Config::default().without_delays(), session.dir.path())
        .with_cancellation(cancel);

    let target = fresh_desktop();
    let outcome = core.restore(&target, None).await;

    assert!(outcome.summary.cancelled);
    assert_eq!(outcome.summary.status(), RestoreStatus::Partial);
    assert!(outcome
        .summary
        .attempts
        .iter()
        .all(|a| a.outcome == LaunchOutcome::Pending));
    assert!(target.live_windows().is_empty());
    assert_eq!(outcome.summary.workspaces_created, 2);
}
