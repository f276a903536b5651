//! Pre-save and post-restore hooks around a full save/restore cycle

use super::common::desktop::{fresh_desktop, work_desktop, TestSession};
use super::common::hooks::write_hook;
use hyprsession::Config;
use std::fs;

const BROWSER_HOOK: &str = r#"
case "$1" in
  pre-save) echo "tab-a tab-b" > "$HYPRSESSION_APP_DIR/tabs" ;;
  post-restore) cp "$HYPRSESSION_APP_DIR/tabs" "$HYPRSESSION_SESSION_DIR/restored-tabs" ;;
esac
"#;

/// A hook's private data survives from save to restore
#[tokio::test]
async fn test_hook_state_flows_from_save_to_restore() {
    let session = TestSession::new();
    write_hook(&session.dir.path().join("hooks"), "firefox", BROWSER_HOOK);

    let report = session.core.save(&work_desktop()).await.unwrap();
    assert_eq!(report.hooks.ran, 1);
    assert_eq!(report.hooks.failed(), 0);

    let app_dir = session.core.store().dir().join("firefox");
    assert_eq!(
        fs::read_to_string(app_dir.join("tabs")).unwrap().trim(),
        "tab-a tab-b"
    );
    assert_eq!(session.core.status().hook_dirs, vec!["firefox".to_string()]);

    let outcome = session.core.restore(&fresh_desktop(), None).await;
    assert_eq!(outcome.summary.hooks.succeeded(), 1);
    let restored = session.core.store().dir().join("restored-tabs");
    assert_eq!(fs::read_to_string(restored).unwrap().trim(), "tab-a tab-b");
}

/// A failing hook is counted but the snapshot is still written
#[tokio::test]
async fn test_failing_hook_does_not_abort_save() {
    let session = TestSession::new();
    let hooks_dir = session.dir.path().join("hooks");
    write_hook(&hooks_dir, "10-broken", "exit 3");
    write_hook(&hooks_dir, "20-fine", "exit 0");

    let report = session.core.save(&work_desktop()).await.unwrap();
    assert_eq!(report.hooks.ran, 2);
    assert_eq!(report.hooks.failed(), 1);
    assert_eq!(report.hooks.failures[0].0, "10-broken");
    assert!(session.core.store().load_enhanced().is_ok());
}

/// Hook-registered launch behaviour is picked up by capture
#[tokio::test]
async fn test_capabilities_file_in_hooks_dir_changes_commands() {
    let session = TestSession::new();
    let hooks_dir = session.dir.path().join("hooks");
    fs::create_dir_all(&hooks_dir).unwrap();
    fs::write(
        hooks_dir.join("capabilities.toml"),
        "[firefox]\ncommand = \"firefox -P work\"\n",
    )
    .unwrap();
    let session = session.reopen(Config::default().without_delays());

    let report = session.core.save(&work_desktop()).await.unwrap();
    let firefox = report
        .snapshot
        .application_map
        .iter()
        .find(|a| a.application_class == "firefox")
        .unwrap();
    assert_eq!(firefox.launch_command, "firefox -P work");
    // The capabilities file is configuration, not a hook
    assert_eq!(report.hooks.ran, 0);
}
