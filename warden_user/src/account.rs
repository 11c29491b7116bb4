//! # Tracking Records
//!
//! One [`AccountRecord`] per managed account. Records live in the tracking ledger, a
//! document kept apart from the daemon configuration so that ownership and expiration
//! can be stored without altering the structure the daemon reads.
//!
//! ## Wire Format
//!
//! ```text
//! {
//!     "username_or_id": "alice",
//!     "creator_id": 1001,
//!     "creation_date": "2024-05-01 10:00:00",
//!     "expiration_date": "2024-05-31 10:00:00"
//! }
//! ```
//!
//! ## Important Notes
//!
//! * Dates are kept as the strings found on disk so a single malformed date never
//!   prevents the rest of the ledger from loading
//! * Records written before expirations existed carry no dates and never expire
//! * The older `username` key is accepted when reading

use crate::misc::{format_timestamp, parse_timestamp, AccountError};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use warden_types::prelude::{AccountId, ActorId};

/// Ownership and validity of one account
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AccountRecord {
    #[serde(rename = "username_or_id", alias = "username")]
    pub identifier: AccountId,
    pub creator_id: ActorId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<String>,
}

impl AccountRecord {
    /// A fresh record created by `creator` at `now`, valid until `expires`
    pub fn new(
        identifier: AccountId,
        creator_id: ActorId,
        now: &NaiveDateTime,
        expires: &NaiveDateTime,
    ) -> Self {
        Self {
            identifier,
            creator_id,
            creation_date: Some(format_timestamp(now)),
            expiration_date: Some(format_timestamp(expires)),
        }
    }

    /// The parsed expiration date. `Ok(None)` for records without one
    pub fn expiration(&self) -> Result<Option<NaiveDateTime>, AccountError> {
        self.expiration_date
            .as_deref()
            .map(parse_timestamp)
            .transpose()
    }

    /// Whether this record has expired strictly before `now`
    pub fn is_expired_at(&self, now: &NaiveDateTime) -> Result<bool, AccountError> {
        Ok(self.expiration()?.map(|exp| exp < *now).unwrap_or(false))
    }

    pub fn is_owned_by(&self, actor: ActorId) -> bool {
        self.creator_id == actor
    }

    /// The expiration date as shown to operators
    pub fn expiration_display(&self) -> &str {
        self.expiration_date.as_deref().unwrap_or("never")
    }
}
