//! Session snapshot model and its on-disk store

pub mod error;
pub mod models;
pub mod store;

pub use error::SnapshotError;
pub use models::{
    derive_assignments, ApplicationWorkspaceAssignment, Position, SessionSnapshot, Size,
    TraditionalEntry, WindowState, WorkspaceId, WorkspaceLayout,
};
pub use store::{SnapshotStore, StagedSnapshot};
