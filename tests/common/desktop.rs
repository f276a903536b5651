//! Simulated Hyprland desktops and throwaway data directories

use hyprsession::compositor::{LiveWindow, MockCompositor};
use hyprsession::snapshot::{Position, Size};
use hyprsession::{Config, SessionCore};
use std::time::Duration;
use tempfile::TempDir;

/// A session core plus the temporary directory it lives in
pub struct TestSession {
    pub dir: TempDir,
    pub core: SessionCore,
}

impl TestSession {
    /// Core with every restore delay zeroed
    pub fn new() -> Self {
        Self::with_config(Config::default().without_delays())
    }

    pub fn with_config(config: Config) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let core = SessionCore::new(config, dir.path());
        Self { dir, core }
    }

    /// Rebuild the core over the same directory, e.g. after writing hooks
    pub fn reopen(self, config: Config) -> Self {
        let core = SessionCore::new(config, self.dir.path());
        Self { dir: self.dir, core }
    }
}

/// Config with no delays and a short, bounded window wait
pub fn quick_config(poll_attempts: u32) -> Config {
    let mut config = Config::default().without_delays();
    config.restore.window_poll_attempts = poll_attempts;
    config.restore.window_poll_interval = Duration::from_millis(5);
    config
}

/// Two named workspaces on one monitor: a terminal on "main" and a
/// floating browser on "web", with "web" focused
pub fn work_desktop() -> MockCompositor {
    let mut browser = LiveWindow::new("0xb", "firefox", 2).with_title("Docs - Mozilla Firefox");
    browser.floating = true;
    browser.position = Position { x: 100, y: 80 };
    browser.size = Size {
        width: 1200,
        height: 900,
    };

    MockCompositor::new()
        .with_monitor(0, "DP-1")
        .with_workspace(1, "main", "DP-1")
        .with_workspace(2, "web", "DP-1")
        .with_window(LiveWindow::new("0xa", "kitty", 1).with_title("~/src"))
        .with_window(browser)
        .with_active_workspace(2)
}

/// A compositor that just started: one monitor, one default workspace
pub fn fresh_desktop() -> MockCompositor {
    MockCompositor::new()
        .with_monitor(0, "DP-1")
        .with_workspace(1, "1", "DP-1")
}
