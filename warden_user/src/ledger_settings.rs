//! Ledger Settings
//!
//! Immutable settings injected into the [`AccountManager`](crate::account_manager::AccountManager)
//! at construction. Every authorization decision reads the super-admin identity from here;
//! there is no process-wide mutable state.
//!
//! # Example
//!
//! ```rust
//! use warden_user::ledger_settings::LedgerSettings;
//!
//! let settings = LedgerSettings::new(1000).with_validity_days(7);
//! assert_eq!(settings.super_admin, 1000);
//! assert_eq!(settings.protected_identifier, "root");
//! ```
//!
//! # Important Notes
//!
//! * The super-admin identity cannot change while the process runs
//! * The protected identifier is matched case-insensitively

use crate::misc::AccountError;
use chrono::{Duration, NaiveDateTime};
use warden_types::prelude::{AccountId, ActorId};

/// Default number of days an account stays active after an add or renew
pub const DEFAULT_VALIDITY_DAYS: i64 = 30;
/// The longest validity window accepted, in days
pub const MAX_VALIDITY_DAYS: i64 = 36_500;
/// The identifier that can never be deleted nor swept
pub const DEFAULT_PROTECTED_IDENTIFIER: &str = "root";

/// Settings for a ledger serving one daemon configuration
#[derive(Clone, Debug)]
pub struct LedgerSettings {
    /// The single privileged identity
    pub super_admin: ActorId,
    /// Days added to "now" on every add/renew
    pub validity_days: i64,
    /// Never deleted, never swept
    pub protected_identifier: String,
    /// The active list written when the daemon configuration is missing or corrupt
    pub seed_accounts: Vec<AccountId>,
}

impl LedgerSettings {
    pub fn new(super_admin: ActorId) -> Self {
        Self {
            super_admin,
            validity_days: DEFAULT_VALIDITY_DAYS,
            protected_identifier: DEFAULT_PROTECTED_IDENTIFIER.to_string(),
            seed_accounts: vec![AccountId::from(DEFAULT_PROTECTED_IDENTIFIER)],
        }
    }

    pub fn with_validity_days(mut self, days: i64) -> Self {
        self.validity_days = days;
        self
    }

    pub fn with_seed_accounts<I: IntoIterator<Item = AccountId>>(mut self, seed: I) -> Self {
        self.seed_accounts = seed.into_iter().collect();
        self
    }

    /// Whether `actor` is the configured super-admin
    pub fn is_super_admin(&self, actor: ActorId) -> bool {
        actor == self.super_admin
    }

    /// Whether `id` may never be deleted nor swept
    pub fn is_protected(&self, id: &AccountId) -> bool {
        id.is_reserved(&self.protected_identifier)
    }

    /// The validity window, or `None` if it cannot be represented
    pub fn validity(&self) -> Option<Duration> {
        Duration::try_days(self.validity_days)
    }

    /// The expiration of an account added or renewed at `now`
    pub fn expiration_from(&self, now: &NaiveDateTime) -> Result<NaiveDateTime, AccountError> {
        self.validity()
            .and_then(|validity| now.checked_add_signed(validity))
            .ok_or_else(|| {
                AccountError::msg(format!(
                    "A validity of {} days cannot be applied to {}",
                    self.validity_days, now
                ))
            })
    }
}
