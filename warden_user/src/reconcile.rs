//! Reconciliation of the daemon configuration against the tracking ledger.
//!
//! Computed inside every mutating operation, after loading both documents and before
//! deciding anything. Each identifier falls in exactly one [`Standing`]:
//!
//! ```text
//!                 in tracking    not in tracking
//! active          Tracked        Untracked   (seed or hand-edited accounts)
//! not active      Orphaned       Absent      (left behind by a failed save)
//! ```
//!
//! Resolution rules, applied by the ledger:
//! * `Orphaned` records are overwritten by `add` and pruned by `repair`
//! * `Untracked` accounts can only be deleted by the super-admin, from the config only

use crate::account::AccountRecord;
use crate::primary_config::PrimaryConfig;
use std::collections::HashSet;
use warden_types::prelude::AccountId;

/// Where an identifier stands across both documents
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Standing {
    /// Active and tracked
    Tracked,
    /// Active but without an owner
    Untracked,
    /// Tracked but no longer active
    Orphaned,
    Absent,
}

/// The symmetric difference between the active list and the tracked identifiers
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Active in the config, missing from tracking
    pub untracked: Vec<AccountId>,
    /// Present in tracking, missing from the active list
    pub orphaned: Vec<AccountId>,
}

impl Reconciliation {
    pub fn compute(config: &PrimaryConfig, tracking: &[AccountRecord]) -> Self {
        let tracked: HashSet<&AccountId> = tracking.iter().map(|r| &r.identifier).collect();
        let active: HashSet<&AccountId> = config.accounts().collect();

        let untracked = config
            .accounts()
            .filter(|id| !tracked.contains(id))
            .cloned()
            .collect::<Vec<_>>();

        let mut seen = HashSet::new();
        let orphaned = tracking
            .iter()
            .map(|r| &r.identifier)
            .filter(|id| !active.contains(id) && seen.insert(*id))
            .cloned()
            .collect::<Vec<_>>();

        if !orphaned.is_empty() {
            log::warn!(target: "warden", "Tracking records without an active account: {}", join(&orphaned));
        }

        if !untracked.is_empty() {
            log::debug!(target: "warden", "Active accounts without a tracking record: {}", join(&untracked));
        }

        Self {
            untracked,
            orphaned,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.untracked.is_empty() && self.orphaned.is_empty()
    }

    /// The standing of `id`, given whether it is active in the config
    pub fn standing(&self, id: &AccountId, active: bool) -> Standing {
        match (active, self.untracked.contains(id), self.orphaned.contains(id)) {
            (true, true, _) => Standing::Untracked,
            (true, false, _) => Standing::Tracked,
            (false, _, true) => Standing::Orphaned,
            (false, _, false) => Standing::Absent,
        }
    }
}

pub(crate) fn join(ids: &[AccountId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(id: &str) -> AccountRecord {
        let now = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        AccountRecord::new(id.into(), 1, &now, &now)
    }

    #[test]
    fn symmetric_difference() {
        let mut config = PrimaryConfig::with_seed(&["root".into()]);
        assert!(config.activate("alice".into()));
        let tracking = vec![record("alice"), record("ghost"), record("ghost")];

        let rec = Reconciliation::compute(&config, &tracking);
        assert_eq!(rec.untracked, vec![AccountId::from("root")]);
        assert_eq!(rec.orphaned, vec![AccountId::from("ghost")]);
        assert!(!rec.is_consistent());

        assert_eq!(rec.standing(&"alice".into(), true), Standing::Tracked);
        assert_eq!(rec.standing(&"root".into(), true), Standing::Untracked);
        assert_eq!(rec.standing(&"ghost".into(), false), Standing::Orphaned);
        assert_eq!(rec.standing(&"nobody".into(), false), Standing::Absent);
    }

    #[test]
    fn numeric_and_textual_identifiers_match() {
        let mut config = PrimaryConfig::with_seed(&[]);
        assert!(config.activate(AccountId::ID(42)));
        let rec = Reconciliation::compute(&config, &[record("42")]);
        assert!(rec.is_consistent());
    }
}
