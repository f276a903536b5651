//! Tier selection against damaged or missing on-disk state

use super::common::desktop::{fresh_desktop, work_desktop, TestSession};
use hyprsession::archive::ArchivedState;
use hyprsession::restore::{FallbackManager, RestoreMode, Tier};
use hyprsession::snapshot::store::WINDOW_STATES_FILE;
use hyprsession::{SnapshotStore, StateArchive};
use proptest::prelude::*;
use std::fs;

/// Tampering with the archive makes restore step down to the snapshot directory
#[tokio::test]
async fn test_tampered_archive_steps_down_to_enhanced() {
    let session = TestSession::new();
    session.core.archive_save(&work_desktop()).await.unwrap();

    let path = session.core.archive().state_path();
    let mut state: ArchivedState =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    state.snapshot.windows[0].application_class = "tampered".to_string();
    fs::write(&path, serde_json::to_string(&state).unwrap()).unwrap();

    let decision = session.core.decide(Some(Tier::Alternate));
    assert_eq!(decision.mode.tier(), Some(Tier::Enhanced));
    assert_eq!(decision.step_downs.len(), 1);
    assert_eq!(decision.step_downs[0].tier, Tier::Alternate);

    let status = session.core.archive().status();
    assert_eq!(status.valid, Some(false));
}

/// A corrupt enhanced file falls back to the flat application list, which
/// relaunches everything on the current workspace
#[tokio::test]
async fn test_corrupt_snapshot_falls_back_to_traditional() {
    let session = TestSession::new();
    session.core.save(&work_desktop()).await.unwrap();
    fs::write(
        session.core.store().dir().join(WINDOW_STATES_FILE),
        "{ not json",
    )
    .unwrap();

    let target = fresh_desktop();
    let outcome = session.core.restore(&target, None).await;
    assert!(matches!(outcome.decision.mode, RestoreMode::Traditional(_)));
    let skipped: Vec<Tier> = outcome.decision.step_downs.iter().map(|s| s.tier).collect();
    assert_eq!(skipped, vec![Tier::Alternate, Tier::Enhanced]);

    assert_eq!(outcome.summary.mode, "traditional");
    assert_eq!(outcome.summary.apps_restored(), 2);
    assert!(!outcome.is_failure());

    let windows = target.live_windows();
    assert_eq!(windows.len(), 2);
    assert!(windows.iter().all(|w| w.workspace_id == 1));
}

/// Nothing saved anywhere: every tier is reported and the restore fails
#[tokio::test]
async fn test_nothing_saved_is_unavailable() {
    let session = TestSession::new();
    let target = fresh_desktop();
    let outcome = session.core.restore(&target, None).await;

    assert!(!outcome.decision.mode.is_available());
    assert_eq!(outcome.decision.step_downs.len(), 3);
    assert!(outcome.is_failure());
    assert!(target.commands().is_empty());
}

/// A configured order without the alternate tier never consults the archive
#[tokio::test]
async fn test_configured_order_is_respected() {
    let mut config = hyprsession::Config::default().without_delays();
    config.restore.tier_order = vec![Tier::Traditional, Tier::Enhanced];
    let session = TestSession::with_config(config);
    session.core.archive_save(&work_desktop()).await.unwrap();

    let decision = session.core.decide(None);
    assert_eq!(decision.mode.tier(), Some(Tier::Traditional));
    assert!(decision.step_downs.is_empty());
}

fn tier() -> impl Strategy<Value = Tier> {
    prop_oneof![
        Just(Tier::Alternate),
        Just(Tier::Enhanced),
        Just(Tier::Traditional),
    ]
}

proptest! {
    /// Each tier is tried at most once, in first-seen order
    #[test]
    fn prop_tier_order_has_no_repeats(order in prop::collection::vec(tier(), 0..10)) {
        let store = SnapshotStore::new("/nonexistent/session-state");
        let archive = StateArchive::new("/nonexistent/archive");
        let manager = FallbackManager::new(&store, &archive, &order);

        let mut expected: Vec<Tier> = Vec::new();
        for t in &order {
            if !expected.contains(t) {
                expected.push(*t);
            }
        }
        prop_assert_eq!(manager.order(), expected.as_slice());

        let decision = manager.decide();
        prop_assert!(!decision.mode.is_available());
        prop_assert_eq!(decision.step_downs.len(), expected.len());
    }

    /// Preferring a tier moves it to the front without duplicating it
    #[test]
    fn prop_preferred_tier_goes_first(order in prop::collection::vec(tier(), 1..10), first in tier()) {
        let store = SnapshotStore::new("/nonexistent/session-state");
        let archive = StateArchive::new("/nonexistent/archive");
        let manager = FallbackManager::new(&store, &archive, &order).preferring(first);

        prop_assert_eq!(manager.order()[0], first);
        let repeats = manager.order().iter().filter(|t| **t == first).count();
        prop_assert_eq!(repeats, 1);
    }
}
