//! Utility modules

pub mod paths;
pub mod tools;

pub use paths::{
    archive_dir, config_path, data_dir, hooks_dir, init_data_dir, log_file_path, logs_dir,
    session_state_dir,
};
pub use tools::{hyprland_instance_present, locate_hyprctl, ToolPaths, ToolStatus};
