//! # Expiration Sweeper
//!
//! Retires every account whose expiration date has passed, from both documents at once.
//! The sweep itself is driven by a scheduler outside this crate; running it twice in a
//! row without time passing changes nothing the second time.
//!
//! ## Important Notes
//!
//! * The protected identifier is never swept
//! * Records without an expiration never expire
//! * A record with a malformed date is logged and kept, the rest of the sweep goes on
//! * A failed reload is logged as critical and the removal stands

use crate::account_manager::AccountManager;
use crate::misc::AccountError;
use crate::reconcile::{join, Reconciliation};
use crate::reload::{reload_logged, ReloadStatus};
use warden_types::prelude::AccountId;

/// What a sweep did
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SweepReport {
    /// Accounts retired by this sweep
    pub removed: Vec<AccountId>,
    /// Records kept because their expiration date could not be read
    pub skipped: Vec<(AccountId, String)>,
    pub reload: ReloadStatus,
}

impl SweepReport {
    /// Whether any account was removed
    pub fn changed(&self) -> bool {
        !self.removed.is_empty()
    }
}

impl std::fmt::Display for SweepReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.changed() {
            write!(f, "Expired accounts removed: {}.", join(&self.removed))?;
        } else {
            write!(f, "No expired accounts.")?;
        }

        if !self.skipped.is_empty() {
            write!(f, " {} record(s) with an unreadable date were kept.", self.skipped.len())?;
        }

        if let ReloadStatus::Failed(reason) = &self.reload {
            write!(f, " Daemon restart failed: {reason}")?;
        }

        Ok(())
    }
}

impl AccountManager {
    /// Removes every account that expired strictly before now
    pub async fn sweep_expired(&self) -> Result<SweepReport, AccountError> {
        let pers = self.get_persistence_handler();

        let (removed, skipped) = {
            let _guard = pers.lock().await;
            let mut config = pers.load_config().await;
            let mut tracking = pers.load_tracking().await;
            let drift = Reconciliation::compute(&config, &tracking);

            let now = self.clock().now();
            let mut expired = Vec::new();
            let mut skipped = Vec::new();

            for record in &tracking {
                if self.settings().is_protected(&record.identifier) {
                    continue;
                }

                match record.is_expired_at(&now) {
                    Ok(true) => {
                        log::info!(target: "warden", "{} expired on {}", record.identifier, record.expiration_display());
                        if drift.orphaned.contains(&record.identifier) {
                            log::debug!(target: "warden", "{} was already inactive in the daemon configuration", record.identifier);
                        }
                        expired.push(record.identifier.clone());
                    }
                    Ok(false) => {}
                    Err(err) => {
                        log::warn!(target: "warden", "Skipping {} during the sweep: {}", record.identifier, err);
                        skipped.push((record.identifier.clone(), err.into_string()));
                    }
                }
            }

            if !expired.is_empty() {
                tracking.retain(|r| !expired.contains(&r.identifier));
                for id in &expired {
                    let _ = config.deactivate(id);
                }

                self.save_both(&config, &tracking).await?;
            }

            (expired, skipped)
        };

        let reload = if removed.is_empty() {
            log::trace!(target: "warden", "Sweep found no expired accounts");
            ReloadStatus::NotRequired
        } else {
            log::info!(target: "warden", "Sweep removed {} account(s): {}", removed.len(), join(&removed));
            reload_logged(self.reload_trigger(), "the expiration sweep").await
        };

        Ok(SweepReport {
            removed,
            skipped,
            reload,
        })
    }
}
