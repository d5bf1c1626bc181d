//! Cron-driven loops for the incremental poller and the status checker.
//!
//! Each scheduler sleeps until the next cron occurrence, skips the tick
//! when disabled or when the lock is busy, and stops when the shutdown
//! channel fires. An in-flight cycle is allowed to finish.

use chrono::Utc;
use cron::Schedule;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::error::SyncError;
use crate::sync::service::SyncService;

/// Settle time before the very first scheduled poll.
const INITIAL_SYNC_DELAY: Duration = Duration::from_secs(5);

/// Runtime on/off switches for both schedulers, flipped by the control
/// plane without restarting the loops.
#[derive(Debug)]
pub struct SchedulerControl {
    poller: AtomicBool,
    checker: AtomicBool,
}

impl SchedulerControl {
    pub fn new(poller_enabled: bool, checker_enabled: bool) -> Self {
        Self {
            poller: AtomicBool::new(poller_enabled),
            checker: AtomicBool::new(checker_enabled),
        }
    }

    pub fn poller_enabled(&self) -> bool {
        self.poller.load(Ordering::Relaxed)
    }

    pub fn set_poller(&self, enabled: bool) {
        self.poller.store(enabled, Ordering::Relaxed);
    }

    pub fn checker_enabled(&self) -> bool {
        self.checker.load(Ordering::Relaxed)
    }

    pub fn set_checker(&self, enabled: bool) {
        self.checker.store(enabled, Ordering::Relaxed);
    }
}

/// Spawns both scheduler loops onto the runtime.
pub fn spawn_schedulers(
    service: Arc<SyncService>,
    control: Arc<SchedulerControl>,
    poll_schedule: Schedule,
    check_schedule: Schedule,
    shutdown: watch::Receiver<bool>,
) {
    {
        let service = Arc::clone(&service);
        let control = Arc::clone(&control);
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            run_poller(service, control, poll_schedule, shutdown).await;
        });
    }
    tokio::spawn(async move {
        run_checker(service, control, check_schedule, shutdown).await;
    });
}

async fn run_poller(
    service: Arc<SyncService>,
    control: Arc<SchedulerControl>,
    schedule: Schedule,
    mut shutdown: watch::Receiver<bool>,
) {
    tokio::select! {
        _ = tokio::time::sleep(INITIAL_SYNC_DELAY) => {}
        _ = shutdown.changed() => return,
    }

    loop {
        let Some(delay) = next_delay(&schedule) else {
            tracing::warn!("Sync schedule has no upcoming occurrence, poller stopping");
            return;
        };
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.changed() => return,
        }
        if !control.poller_enabled() {
            continue;
        }

        match service.run_incremental_cycle().await {
            Ok(summary) if summary.skipped => {}
            Ok(_) => {}
            Err(SyncError::LockBusy) => {
                tracing::debug!("Sync lock busy, skipping scheduled poll");
            }
            Err(err) => {
                tracing::warn!(%err, "Scheduled incremental sync failed");
            }
        }
    }
}

async fn run_checker(
    service: Arc<SyncService>,
    control: Arc<SchedulerControl>,
    schedule: Schedule,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let Some(delay) = next_delay(&schedule) else {
            tracing::warn!("Check schedule has no upcoming occurrence, checker stopping");
            return;
        };
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.changed() => return,
        }
        if !control.checker_enabled() {
            continue;
        }

        match service.run_status_check().await {
            Ok(_) => {}
            Err(SyncError::LockBusy) => {
                tracing::debug!("Sync lock busy, skipping scheduled status check");
            }
            Err(err) => {
                tracing::warn!(%err, "Scheduled status check failed");
            }
        }
    }
}

fn next_delay(schedule: &Schedule) -> Option<Duration> {
    let next = schedule.upcoming(Utc).next()?;
    (next - Utc::now()).to_std().ok().or(Some(Duration::ZERO))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn control_flags_toggle() {
        let control = SchedulerControl::new(true, false);
        assert!(control.poller_enabled());
        assert!(!control.checker_enabled());

        control.set_poller(false);
        control.set_checker(true);
        assert!(!control.poller_enabled());
        assert!(control.checker_enabled());
    }

    #[test]
    fn next_delay_exists_for_five_minute_schedule() {
        let schedule = Schedule::from_str("0 */5 * * * *").unwrap();
        let delay = next_delay(&schedule).expect("upcoming occurrence");
        assert!(delay <= Duration::from_secs(300));
    }
}
