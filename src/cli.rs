use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "hyprsession")]
#[command(about = "Save and restore Hyprland workspaces, windows and applications")]
#[command(version)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Data directory (defaults to $HYPRSESSION_DIR or ~/.config/hyprland-session-manager)
    #[arg(long, global = true, value_name = "DIR")]
    pub session_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Capture the current session
    Save,

    /// Restore the last saved session
    Restore,

    /// Delete the saved snapshot
    Clean,

    /// Show what is saved and which tier a restore would use
    Status,

    /// Capture the current session into the checksummed archive
    ArchiveSave,

    /// Restore preferring the checksummed archive
    ArchiveRestore,

    /// Show archive contents and checksum validity
    ArchiveStatus,

    /// Convert the current snapshot directory into an archive
    ArchiveMigrate,

    /// Save repeatedly until interrupted
    AutoSave {
        /// Seconds between saves (defaults to auto_save.interval_secs)
        #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(10..))]
        interval: Option<u64>,
    },
}

impl Commands {
    /// Whether the command talks to a running compositor
    pub fn needs_compositor(&self) -> bool {
        matches!(
            self,
            Commands::Save
                | Commands::Restore
                | Commands::ArchiveSave
                | Commands::ArchiveRestore
                | Commands::AutoSave { .. }
        )
    }
}

impl Cli {
    /// Default tracing directive for the requested verbosity
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            _ => tracing::Level::DEBUG,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from(["hyprsession", "archive-restore"]).unwrap();
        assert_eq!(cli.command, Commands::ArchiveRestore);
        assert!(cli.command.needs_compositor());

        let cli = Cli::try_parse_from(["hyprsession", "status"]).unwrap();
        assert!(!cli.command.needs_compositor());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["hyprsession", "save", "-vv", "--session-dir", "/tmp/s"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.log_level(), tracing::Level::DEBUG);
        assert_eq!(cli.session_dir, Some(PathBuf::from("/tmp/s")));
    }

    #[test]
    fn test_auto_save_interval() {
        let cli = Cli::try_parse_from(["hyprsession", "auto-save", "--interval", "60"]).unwrap();
        assert_eq!(cli.command, Commands::AutoSave { interval: Some(60) });
        assert!(cli.command.needs_compositor());

        let cli = Cli::try_parse_from(["hyprsession", "auto-save"]).unwrap();
        assert_eq!(cli.command, Commands::AutoSave { interval: None });

        assert!(Cli::try_parse_from(["hyprsession", "auto-save", "--interval", "3"]).is_err());
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(Cli::try_parse_from(["hyprsession", "snapshot"]).is_err());
    }
}
