//! Timer trigger: the job's only entry point, fired once per tick.
//!
//! Ticks are serialized: the next tick is only awaited after the previous run
//! returned, so two runs never overlap within one process. A tick that fires
//! noticeably after its scheduled instant is reported as past due.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use ftp_sync_core::synchronise::SyncReport;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info};

/// How late a tick may fire before it counts as past due.
pub const PAST_DUE_TOLERANCE: Duration = Duration::from_secs(5);

pub const DEFAULT_PERIOD: Duration = Duration::from_secs(60 * 60);

/// What the trigger knows about the tick that fired it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerInfo {
    pub past_due: bool,
}

impl TimerInfo {
    pub fn for_tick(scheduled: Instant, fired: Instant) -> Self {
        Self {
            past_due: fired.saturating_duration_since(scheduled) > PAST_DUE_TOLERANCE,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Schedule {
    pub period: Duration,
    /// Fire the first tick immediately instead of one period from now.
    pub run_on_startup: bool,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            period: DEFAULT_PERIOD,
            run_on_startup: true,
        }
    }
}

/// Runs `job` for one tick.
pub async fn timer_trigger<F, Fut>(timer: TimerInfo, job: F) -> Result<()>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<SyncReport>>,
{
    if timer.past_due {
        info!("The timer is past due!");
    }
    let report = job().await?;
    info!(run_id = %report.run_id, uploaded = ?report.published.uploaded, "Finished!");
    Ok(())
}

/// Fires `on_tick` on the schedule until `shutdown` resolves. A failed tick is
/// logged and the schedule keeps going.
pub async fn run_schedule<F, Fut, S>(schedule: Schedule, mut on_tick: F, shutdown: S) -> Result<()>
where
    F: FnMut(TimerInfo) -> Fut,
    Fut: Future<Output = Result<()>>,
    S: Future<Output = ()>,
{
    let start = if schedule.run_on_startup {
        Instant::now()
    } else {
        Instant::now() + schedule.period
    };
    let mut interval = interval_at(start, schedule.period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(period_secs = schedule.period.as_secs(), run_on_startup = schedule.run_on_startup, "Schedule started");

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested, stopping schedule");
                return Ok(());
            }
            scheduled = interval.tick() => {
                let timer = TimerInfo::for_tick(scheduled, Instant::now());
                if let Err(e) = on_tick(timer).await {
                    error!(error = %e, "Scheduled run failed");
                }
            }
        }
    }
}
