//! Daily expiration sweep.
//!
//! Sleeps until the next occurrence of the configured local hour, sweeps, audits the
//! result and starts over. A failed sweep is logged and retried the next day.

use crate::audit::{AuditAction, AuditLog};
use chrono::{Duration, NaiveDateTime};
use warden_io::tokio;
use warden_io::tokio::task::JoinHandle;
use warden_user::prelude::{AccountError, AccountManager, ActorId, SweepReport};

/// The identity recorded in the audit log for sweeps
pub const SCHEDULER_ACTOR: ActorId = 0;

/// How long to wait from `now` until the next `hour`:00:00. Never zero: at exactly
/// `hour`:00:00 the next run is a day away
pub fn delay_until_next(now: NaiveDateTime, hour: u32) -> Duration {
    let target = match now.date().and_hms_opt(hour, 0, 0) {
        Some(today) if today > now => today,
        Some(today) => today + Duration::days(1),
        None => now + Duration::days(1),
    };

    target - now
}

/// Runs the sweep once a day
#[derive(Clone)]
pub struct SweepScheduler {
    manager: AccountManager,
    audit: AuditLog,
    hour: u32,
}

impl SweepScheduler {
    pub fn new(manager: AccountManager, audit: AuditLog, hour: u32) -> Self {
        Self {
            manager,
            audit,
            hour,
        }
    }

    /// Sweeps now and audits the outcome
    pub async fn run_once(&self) -> Result<SweepReport, AccountError> {
        match self.manager.sweep_expired().await {
            Ok(report) => {
                if report.changed() || !report.skipped.is_empty() {
                    self.audit
                        .record(SCHEDULER_ACTOR, AuditAction::Sweep, true, None, report.to_string())
                        .await;
                }

                Ok(report)
            }

            Err(err) => {
                log::error!(target: "warden", "Expiration sweep failed: {}", err);
                self.audit
                    .record(SCHEDULER_ACTOR, AuditAction::Sweep, false, None, err.to_string())
                    .await;
                Err(err)
            }
        }
    }

    /// How long until the next sweep, by the account manager's clock
    pub fn next_delay(&self) -> Duration {
        delay_until_next(self.manager.clock().now(), self.hour)
    }

    /// Sweeps every day at the configured hour, forever
    pub async fn run(self) {
        loop {
            let delay = self.next_delay();
            log::info!(target: "warden", "Next expiration sweep in {} minute(s)", delay.num_minutes());

            let delay = delay
                .to_std()
                .unwrap_or_else(|_| std::time::Duration::from_secs(60));
            tokio::time::sleep(delay).await;

            if let Ok(report) = self.run_once().await {
                log::info!(target: "warden", "{}", report);
            }
        }
    }

    /// Runs [`Self::run`] in the background
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::task::spawn(self.run())
    }
}
