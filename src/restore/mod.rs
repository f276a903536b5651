//! Snapshot restoration
//!
//! [`FallbackManager`] picks what to replay, [`RestoreOrchestrator`]
//! replays it and produces a [`RestoreSummary`].

pub mod fallback;
pub mod orchestrator;
pub mod positioning;
pub mod summary;

pub use fallback::{Decision, FallbackManager, RestoreMode, StepDown, Tier};
pub use orchestrator::{Phase, RestoreOrchestrator};
pub use positioning::{placement_commands, title_similarity, WindowMatcher};
pub use summary::{RestoreStatus, RestoreSummary, WindowCounts};
