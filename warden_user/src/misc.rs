//! Miscellaneous Utilities and Error Handling
//!
//! This module provides the error taxonomy shared by every warden operation together with
//! the timestamp helpers used by the tracking ledger.
//!
//! # Features
//!
//! * **Error Handling**
//!   - One variant per refusal reason (exists, missing, protected, denied, ...)
//!   - Human-readable messages that can be returned to the operator verbatim
//!   - Storage failures flag whether the document set was left inconsistent
//!
//! * **Timestamps**
//!   - Naive local time with second precision
//!   - `YYYY-MM-DD HH:MM:SS` wire format
//!
//! # Important Notes
//!
//! * Reload failures are represented here but never returned from a ledger operation;
//!   they are recorded on the receipt instead
//! * No timezone conversion is performed anywhere in the ledger
//!
//! # Related Components
//!
//! * `AccountManager` - Produces every variant
//! * `PersistenceHandler` - Produces `Storage`

use crate::backend::Document;
use chrono::{NaiveDateTime, Timelike};
use warden_types::prelude::{AccountId, ActorId};

/// Default Error type for this crate
#[derive(Debug)]
pub enum AccountError {
    /// The identifier is already present in the daemon's active list
    AlreadyExists(AccountId),
    /// The identifier is absent from both documents (or from tracking, for renewals)
    NotFound(AccountId),
    /// The identifier is reserved and may never be deleted
    Protected(AccountId),
    /// The actor does not own the account. `creator` is `None` when the account has no
    /// tracking record at all
    PermissionDenied {
        target: AccountId,
        creator: Option<ActorId>,
    },
    /// The actor is neither the super-admin nor an allowlisted manager
    Unauthorized(ActorId),
    /// The actor is already the super-admin; granting would be redundant
    AlreadyPrivileged(ActorId),
    /// The actor is already on the manager allowlist
    AlreadyGranted(ActorId),
    /// The actor is not on the manager allowlist
    NotGranted(ActorId),
    /// The supplied identifier was empty
    InvalidIdentifier(String),
    /// Reading, writing or serializing a document failed. When `inconsistent` is set, an
    /// earlier document of the same operation was already written
    Storage {
        document: Document,
        reason: String,
        inconsistent: bool,
    },
    /// The consuming daemon could not be restarted
    ReloadFailed(String),
    /// Generic error
    Generic(String),
}

impl AccountError {
    pub(crate) fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Generic(msg.into())
    }

    pub(crate) fn storage<T: ToString>(document: Document, reason: T) -> Self {
        Self::Storage {
            document,
            reason: reason.to_string(),
            inconsistent: false,
        }
    }

    /// Marks a storage failure as having happened after another document was already saved
    pub(crate) fn into_inconsistent(self) -> Self {
        match self {
            Self::Storage {
                document, reason, ..
            } => Self::Storage {
                document,
                reason,
                inconsistent: true,
            },
            other => other,
        }
    }

    /// Whether the document set may now disagree with itself
    pub fn is_inconsistent(&self) -> bool {
        matches!(
            self,
            Self::Storage {
                inconsistent: true,
                ..
            }
        )
    }

    /// Consumes self and returns the underlying error message
    pub fn into_string(self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for AccountError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            AccountError::AlreadyExists(id) => write!(
                f,
                "The account '{id}' already exists in the daemon configuration."
            ),
            AccountError::NotFound(id) => write!(f, "The account '{id}' was not found."),
            AccountError::Protected(id) => {
                write!(f, "The account '{id}' is protected and cannot be removed.")
            }
            AccountError::PermissionDenied {
                target,
                creator: Some(creator),
            } => write!(
                f,
                "You are not allowed to manage '{target}' (created by: {creator})."
            ),
            AccountError::PermissionDenied {
                target,
                creator: None,
            } => write!(
                f,
                "The account '{target}' is not in the management records. Contact the admin."
            ),
            AccountError::Unauthorized(actor) => {
                write!(f, "Identity {actor} is not allowed to use this command.")
            }
            AccountError::AlreadyPrivileged(actor) => write!(
                f,
                "Identity {actor} is the super-admin and already has every permission."
            ),
            AccountError::AlreadyGranted(actor) => {
                write!(f, "Identity {actor} is already a manager.")
            }
            AccountError::NotGranted(actor) => write!(f, "Identity {actor} is not a manager."),
            AccountError::InvalidIdentifier(reason) => write!(f, "{reason}"),
            AccountError::Storage {
                document,
                reason,
                inconsistent: true,
            } => write!(f, "Critical error saving {document}: {reason}. The documents may now be inconsistent, check the logs."),
            AccountError::Storage {
                document,
                reason,
                inconsistent: false,
            } => write!(f, "Error saving {document}: {reason}."),
            AccountError::ReloadFailed(reason) => write!(f, "Daemon reload failed: {reason}"),
            AccountError::Generic(e) => write!(f, "{e}"),
        }
    }
}

impl From<std::io::Error> for AccountError {
    fn from(e: std::io::Error) -> Self {
        AccountError::Generic(format!("{e}"))
    }
}

impl From<serde_json::Error> for AccountError {
    fn from(e: serde_json::Error) -> Self {
        AccountError::Generic(format!("Invalid JSON: {e}"))
    }
}

impl From<warden_types::errors::Error> for AccountError {
    fn from(e: warden_types::errors::Error) -> Self {
        AccountError::InvalidIdentifier(e.to_string())
    }
}

impl std::error::Error for AccountError {}

/// The wire format of every date stored in the tracking ledger
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// The format used in backup file names
pub const BACKUP_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Formats a timestamp for the tracking ledger
pub fn format_timestamp(time: &NaiveDateTime) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses a tracking-ledger timestamp
pub fn parse_timestamp<T: AsRef<str>>(raw: T) -> Result<NaiveDateTime, AccountError> {
    NaiveDateTime::parse_from_str(raw.as_ref().trim(), TIMESTAMP_FORMAT).map_err(|err| {
        AccountError::msg(format!("Invalid timestamp '{}': {err}", raw.as_ref()))
    })
}

/// Drops sub-second precision, since the ledger stores whole seconds
pub fn truncate_to_seconds(time: NaiveDateTime) -> NaiveDateTime {
    time.with_nanosecond(0).unwrap_or(time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rstest::rstest;

    #[test]
    fn timestamp_wire_format() {
        let time = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(7, 5, 1)
            .unwrap();
        assert_eq!(format_timestamp(&time), "2024-03-09 07:05:01");
        assert_eq!(parse_timestamp("2024-03-09 07:05:01").unwrap(), time);
    }

    #[rstest]
    #[case("")]
    #[case("2024-03-09")]
    #[case("2024-13-09 07:05:01")]
    #[case("yesterday")]
    fn malformed_timestamps(#[case] raw: &str) {
        assert!(parse_timestamp(raw).is_err());
    }

    #[test]
    fn permission_message_names_creator() {
        let err = AccountError::PermissionDenied {
            target: "alice".into(),
            creator: Some(1001),
        };
        assert!(err.to_string().contains("1001"));
    }

    #[test]
    fn inconsistency_flag() {
        let err = AccountError::storage(Document::Tracking, "disk full");
        assert!(!err.is_inconsistent());
        let err = err.into_inconsistent();
        assert!(err.is_inconsistent());
        assert!(err.to_string().contains("inconsistent"));
    }
}
