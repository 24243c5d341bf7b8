///
/// This module implements the CLI for ftp-sync: command parsing, wiring of the
/// concrete FTP archive, blob client and expander, and the two ways of firing
/// the timer trigger (once, or on a schedule).
///
/// All synchronisation logic lives in [`ftp-sync-core`]; this module is glue.
///
/// ## How To Use
/// - `ftp-sync run` fires the trigger once, as an on-time tick.
/// - `ftp-sync schedule` fires it on a fixed cadence until interrupted.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`ftp-sync-core`]: ../../ftp-sync-core/
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ftp_sync_core::config::SyncConfig;
use ftp_sync_core::extract::SevenZipExpander;
use ftp_sync_core::ftp::FtpArchive;
use ftp_sync_core::synchronise::{synchronise, SyncReport};

use crate::load_config::load_config;
use crate::schedule::{run_schedule, timer_trigger, Schedule, TimerInfo, DEFAULT_PERIOD};
use crate::upload::BlobClient;

/// CLI for ftp-sync: mirror new FTP archives into a blob container.
#[derive(Parser)]
#[clap(
    name = "ftp-sync",
    version,
    about = "Mirror new archives from an FTP tree into an Azure blob container"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a single synchronisation now
    Run,
    /// Run synchronisations on a fixed cadence until interrupted
    Schedule {
        /// Seconds between ticks
        #[clap(long, default_value_t = DEFAULT_PERIOD.as_secs())]
        period_secs: u64,
        /// Wait one full period before the first run
        #[clap(long)]
        no_run_on_startup: bool,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    let config = load_config()?;
    config.trace_loaded();
    let config = &config;

    match cli.command {
        Commands::Run => {
            tracing::info!(command = "run", "Starting synchronisation");
            timer_trigger(TimerInfo { past_due: false }, move || run_job(config)).await
        }
        Commands::Schedule {
            period_secs,
            no_run_on_startup,
        } => {
            let schedule = Schedule {
                period: Duration::from_secs(period_secs.max(1)),
                run_on_startup: !no_run_on_startup,
            };
            tracing::info!(command = "schedule", ?schedule, "Starting scheduled synchronisation");
            run_schedule(
                schedule,
                move |timer| timer_trigger(timer, move || run_job(config)),
                shutdown_signal(),
            )
            .await
        }
    }
}

/// One full run against the configured FTP server and container.
///
/// A store client that cannot be built fails the run before the remote is
/// contacted; only a store that cannot be listed falls back to the earliest
/// watermark.
pub async fn run_job(config: &SyncConfig) -> Result<SyncReport> {
    let archive = FtpArchive::new(config.remote.clone());
    let store = BlobClient::from_config(&config.store)?;

    let report = synchronise(
        &archive,
        &store,
        Arc::new(SevenZipExpander),
        &config.scratch_root,
    )
    .await?;
    match serde_json::to_string_pretty(&report) {
        Ok(json) => tracing::debug!(json = %json, "[SYNC] Run report"),
        Err(e) => tracing::error!(error = ?e, "[SYNC] Failed to serialize run report"),
    }
    Ok(report)
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("received ctrl-c, shutting down"),
        Err(e) => {
            tracing::error!(error = %e, "ctrl-c handler failed, running until killed");
            std::future::pending::<()>().await;
        }
    }
}
