//! Core wiring shared by every command.
//!
//! [`SessionCore`] owns the snapshot store, archive, hook runner and
//! capability table for one data directory and exposes the save, restore,
//! clean, status and archive operations on top of them.

mod session_core;

pub use session_core::{
    ArchiveStatusLine, AutoSaveReport, RestoreOutcome, SessionCore, SessionStatus,
};
