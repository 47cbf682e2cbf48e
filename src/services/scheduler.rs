//! Polling scheduler.
//!
//! Drives the forwarding service across all configured accounts on a fixed
//! period. The first pass runs immediately at startup; ticks never overlap,
//! a pass that overruns the period delays the next tick instead of running
//! concurrently with it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};

use super::ForwardService;

/// Periodic driver for the forwarding service.
pub struct Scheduler {
    service: ForwardService,
    period: Duration,
    stop_flag: AtomicBool,
}

impl Scheduler {
    /// Creates a scheduler that runs the service once per period.
    pub fn new(service: ForwardService, period: Duration) -> Self {
        Self {
            service,
            period,
            stop_flag: AtomicBool::new(false),
        }
    }

    /// Returns the configured tick period.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Runs the polling loop until [`stop`](Self::stop) is called.
    ///
    /// Each iteration awaits the full tick before sleeping again, so two
    /// passes can never mutate the same account's unread set concurrently.
    /// A tick that fails outright (credential directory unreadable) is
    /// logged and retried on the next tick.
    pub async fn run(&self) {
        let mut interval = time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            if self.stop_flag.load(Ordering::SeqCst) {
                break;
            }

            match self.service.run_tick().await {
                Ok(report) => {
                    tracing::info!(
                        accounts = report.accounts_processed,
                        failed = report.accounts_failed,
                        forwarded = report.forwarded,
                        "tick complete"
                    );
                }
                Err(e) => {
                    tracing::error!(error = %e, "tick failed, will retry next period");
                }
            }
        }
    }

    /// Requests the polling loop to stop after the current tick.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }

    /// Returns whether a stop has been requested.
    pub fn is_stopped(&self) -> bool {
        self.stop_flag.load(Ordering::SeqCst)
    }
}
