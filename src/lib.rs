pub mod archive;
pub mod capture;
pub mod cli;
pub mod compositor;
pub mod config;
pub mod core;
pub mod hooks;
pub mod launch;
pub mod restore;
pub mod snapshot;
pub mod util;

pub use archive::{ArchiveError, StateArchive};
pub use capture::{CaptureError, CaptureOrchestrator, CaptureReport};
pub use compositor::{Compositor, CompositorCommand, CompositorError, HyprctlClient, MockCompositor};
pub use config::Config;
pub use crate::core::SessionCore;
pub use hooks::{HookMode, HookRunner};
pub use launch::{CapabilityTable, Launcher, LaunchOutcome};
pub use restore::{FallbackManager, RestoreMode, RestoreOrchestrator, RestoreSummary, Tier};
pub use snapshot::{SessionSnapshot, SnapshotError, SnapshotStore};
