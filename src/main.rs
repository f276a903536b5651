use anyhow::{bail, Context, Result};
use clap::Parser;
use hyprsession::cli::{Cli, Commands};
use hyprsession::compositor::HyprctlClient;
use hyprsession::core::{ArchiveStatusLine, SessionCore};
use hyprsession::restore::Tier;
use hyprsession::util::ToolStatus;
use hyprsession::{util, Config};
use std::fs::{self, OpenOptions};
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    util::init_data_dir(cli.session_dir.clone());

    // Initialize logging to file (<data_dir>/logs/hyprsession.log)
    fs::create_dir_all(util::logs_dir())?;

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(util::log_file_path())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(cli.log_level().into()),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .init();

    let config = Config::load().context("Failed to load configuration")?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing current step");
            on_interrupt.cancel();
        }
    });

    let core = SessionCore::open_default(config).with_cancellation(cancel);
    run(cli.command, &core).await
}

async fn run(command: Commands, core: &SessionCore) -> Result<ExitCode> {
    let compositor = if command.needs_compositor() {
        Some(connect(core.config()).await?)
    } else {
        None
    };

    match (command, compositor) {
        (Commands::Save, Some(hyprctl)) => {
            let report = core.save(&hyprctl).await.context("Capture failed")?;
            print_capture(&report);
        }
        (Commands::ArchiveSave, Some(hyprctl)) => {
            let report = core
                .archive_save(&hyprctl)
                .await
                .context("Archive capture failed")?;
            print_capture(&report);
            println!("Archived to {}", core.archive().state_path().display());
        }
        (Commands::Restore, Some(hyprctl)) => {
            return Ok(restore(core, &hyprctl, None).await);
        }
        (Commands::ArchiveRestore, Some(hyprctl)) => {
            return Ok(restore(core, &hyprctl, Some(Tier::Alternate)).await);
        }
        (Commands::AutoSave { interval }, Some(hyprctl)) => {
            let interval = interval
                .map(Duration::from_secs)
                .unwrap_or(core.config().auto_save.interval);
            println!(
                "Saving every {}s to {}, press Ctrl-C to stop",
                interval.as_secs(),
                core.store().dir().display()
            );
            let report = core.auto_save(&hyprctl, interval).await;
            println!("Auto-save stopped: {} saves, {} failed", report.saves, report.failures);
        }
        (Commands::Clean, _) => {
            if core.clean().context("Failed to remove snapshot")? {
                println!("Removed {}", core.store().dir().display());
            } else {
                println!("Nothing to clean");
            }
        }
        (Commands::Status, _) => println!("{}", core.status()),
        (Commands::ArchiveStatus, _) => {
            let status = core.archive().status();
            println!("{}", ArchiveStatusLine(&status));
            if let Some(saved_at) = status.saved_at {
                println!("Saved: {}", saved_at.to_rfc3339());
            }
            if let Some(captured_at) = status.captured_at {
                println!("Captured: {}", captured_at.to_rfc3339());
            }
            if status.valid == Some(false) {
                return Ok(ExitCode::FAILURE);
            }
        }
        (Commands::ArchiveMigrate, _) => {
            let state = core.archive_migrate().context("Migration failed")?;
            println!(
                "Migrated {} workspaces, {} windows to {}",
                state.snapshot.workspaces.len(),
                state.snapshot.windows.len(),
                core.archive().state_path().display()
            );
        }
        (command, None) => bail!("{:?} requires a compositor connection", command),
    }
    Ok(ExitCode::SUCCESS)
}

/// Refuse to start unless Hyprland is running and answering
async fn connect(config: &Config) -> Result<HyprctlClient> {
    if !util::hyprland_instance_present() {
        bail!(
            "Hyprland is not running ({} is not set)",
            util::tools::HYPRLAND_INSTANCE_ENV
        );
    }
    let path = match util::locate_hyprctl(&config.tool_paths) {
        ToolStatus::Available(path) => path,
        ToolStatus::ConfiguredPathInvalid(path) => {
            bail!("Configured hyprctl is not an executable: {}", path.display())
        }
        ToolStatus::NotFound => bail!("Required tool not found in PATH: hyprctl"),
    };

    let hyprctl = HyprctlClient::new(path);
    hyprctl
        .ping()
        .await
        .context("Hyprland did not answer a version query")?;
    Ok(hyprctl)
}

async fn restore(core: &SessionCore, hyprctl: &HyprctlClient, prefer: Option<Tier>) -> ExitCode {
    let outcome = core.restore(hyprctl, prefer).await;
    for step in &outcome.decision.step_downs {
        println!("Skipped {} tier: {}", step.tier.as_str(), step.reason);
    }
    if !outcome.decision.mode.is_available() {
        eprintln!("No usable saved session found");
        return ExitCode::FAILURE;
    }
    println!("{}", outcome.summary);
    if outcome.is_failure() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn print_capture(report: &hyprsession::capture::CaptureReport) {
    let snapshot = &report.snapshot;
    println!(
        "Saved {} workspaces, {} windows, {} applications",
        snapshot.workspaces.len(),
        snapshot.windows.len(),
        snapshot.application_map.len()
    );
    for failure in &report.query_failures {
        println!("Warning: {} query failed, snapshot may be incomplete", failure);
    }
    if report.hooks.ran > 0 {
        println!(
            "Hooks: {}/{} succeeded",
            report.hooks.succeeded(),
            report.hooks.ran
        );
    }
}
