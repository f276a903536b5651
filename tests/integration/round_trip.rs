//! Capture a desktop, then replay it onto a freshly started compositor

use super::common::desktop::{fresh_desktop, work_desktop, TestSession};
use hyprsession::compositor::CompositorCommand;
use hyprsession::restore::{RestoreStatus, Tier};

/// Workspaces, windows, placement and focus all come back
#[tokio::test]
async fn test_save_and_restore_recreates_the_desktop() {
    let session = TestSession::new();
    let report = session.core.save(&work_desktop()).await.unwrap();
    assert!(report.query_failures.is_empty());
    assert_eq!(report.snapshot.workspaces.len(), 2);
    assert_eq!(report.snapshot.active_workspace_id, Some(2));

    let target = fresh_desktop();
    let outcome = session.core.restore(&target, None).await;
    assert_eq!(outcome.decision.mode.tier(), Some(Tier::Enhanced));
    assert!(!outcome.is_failure());
    assert_eq!(outcome.summary.status(), RestoreStatus::Full);
    assert_eq!(outcome.summary.apps_restored(), 2);

    assert_eq!(target.workspace_name(1).as_deref(), Some("main"));
    assert_eq!(target.workspace_name(2).as_deref(), Some("web"));

    let windows = target.live_windows();
    assert_eq!(windows.len(), 2);
    let kitty = windows.iter().find(|w| w.class == "kitty").unwrap();
    assert_eq!(kitty.workspace_id, 1);
    let firefox = windows.iter().find(|w| w.class == "firefox").unwrap();
    assert_eq!(firefox.workspace_id, 2);
    assert!(firefox.floating);
    assert_eq!((firefox.position.x, firefox.position.y), (100, 80));
    assert_eq!((firefox.size.width, firefox.size.height), (1200, 900));

    assert_eq!(target.current_workspace(), Some(2));
}

/// Restoring the same snapshot twice issues the same commands in the same order
#[tokio::test]
async fn test_restore_is_deterministic() {
    let session = TestSession::new();
    session.core.save(&work_desktop()).await.unwrap();

    let first = fresh_desktop();
    session.core.restore(&first, None).await;
    let second = fresh_desktop();
    session.core.restore(&second, None).await;

    assert!(!first.commands().is_empty());
    assert_eq!(first.commands(), second.commands());
}

/// Workspaces are recreated before anything is launched
#[tokio::test]
async fn test_workspaces_exist_before_launches() {
    let session = TestSession::new();
    session.core.save(&work_desktop()).await.unwrap();

    let target = fresh_desktop();
    session.core.restore(&target, None).await;

    let commands = target.commands();
    let first_launch = commands
        .iter()
        .position(|c| {
            matches!(
                c,
                CompositorCommand::Exec { .. } | CompositorCommand::ExecOnWorkspace { .. }
            )
        })
        .unwrap();
    let last_rename = commands
        .iter()
        .rposition(|c| matches!(c, CompositorCommand::RenameWorkspace { .. }))
        .unwrap();
    assert!(last_rename < first_launch);
}

/// An empty desktop captures and restores as a full, empty success
#[tokio::test]
async fn test_empty_desktop_round_trip() {
    let session = TestSession::new();
    let report = session.core.save(&fresh_desktop()).await.unwrap();
    assert!(report.snapshot.windows.is_empty());

    let target = fresh_desktop();
    let outcome = session.core.restore(&target, None).await;
    assert_eq!(outcome.summary.apps_expected(), 0);
    assert_eq!(outcome.summary.status(), RestoreStatus::Full);
    assert!(!outcome.is_failure());
    assert!(target.live_windows().is_empty());
}

/// The archive alone is enough to bring the session back
#[tokio::test]
async fn test_archive_round_trip() {
    let session = TestSession::new();
    session.core.archive_save(&work_desktop()).await.unwrap();
    session.core.clean().unwrap();

    let target = fresh_desktop();
    let outcome = session.core.restore(&target, Some(Tier::Alternate)).await;
    assert_eq!(outcome.decision.mode.tier(), Some(Tier::Alternate));
    assert!(outcome.decision.step_downs.is_empty());
    assert_eq!(outcome.summary.mode, "alternate");
    assert_eq!(target.live_windows().len(), 2);
}
