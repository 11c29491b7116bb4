//! # Document Serialization
//!
//! JSON encoding for the three persisted documents, plus the recovery rules applied when
//! a document is read back. Decoding never fails: a missing, empty or malformed document
//! is replaced by its default and a diagnostic is logged.
//!
//! ## Recovery Rules
//!
//! * **Config**: must be an object with an `auth.config` array, otherwise the seeded
//!   default configuration is used
//! * **Tracking**: must be an array; entries missing `username_or_id` or `creator_id`
//!   are dropped one by one
//! * **Allowlist**: must be an array; non-integer entries and duplicates are dropped
//!
//! ## Related Components
//!
//! * `PersistenceHandler` - Calls these after every backend read
//! * `PrimaryConfig` - Performs the config shape validation

use crate::account::AccountRecord;
use crate::backend::Document;
use crate::misc::AccountError;
use crate::primary_config::PrimaryConfig;
use serde::Serialize;
use serde_json::Value;
use warden_types::prelude::{AccountId, ActorId};

/// Convenient JSON methods for anything persisted as a document
pub trait JsonIO {
    /// Pretty-prints self, the way the daemon's own configuration is formatted
    fn serialize_to_document(&self, document: Document) -> Result<Vec<u8>, AccountError>
    where
        Self: Serialize,
    {
        let mut bytes = serde_json::to_vec_pretty(self)
            .map_err(|err| AccountError::storage(document, err))?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

impl<T: Serialize> JsonIO for T {}

/// Returns the parsed JSON value, or `None` (after logging why) when the raw document
/// is absent, blank or not JSON
fn decode_value(document: Document, raw: Option<Vec<u8>>) -> Option<Value> {
    let raw = match raw {
        Some(raw) => raw,
        None => {
            log::warn!(target: "warden", "{} does not exist. Using the default", document);
            return None;
        }
    };

    if raw.iter().all(u8::is_ascii_whitespace) {
        log::warn!(target: "warden", "{} is empty. Using the default", document);
        return None;
    }

    match serde_json::from_slice::<Value>(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            log::error!(target: "warden", "Unable to decode {}: {}. Using the default", document, err);
            None
        }
    }
}

/// Decodes the daemon configuration, falling back to `seed` as the active list
pub fn decode_config(raw: Option<Vec<u8>>, seed: &[AccountId]) -> PrimaryConfig {
    let Some(value) = decode_value(Document::Config, raw) else {
        return PrimaryConfig::with_seed(seed);
    };

    PrimaryConfig::from_value(value).unwrap_or_else(|err| {
        log::error!(target: "warden", "Invalid structure in {}: {}. Using the default", Document::Config, err);
        PrimaryConfig::with_seed(seed)
    })
}

/// Decodes the tracking ledger, skipping entries that are structurally invalid
pub fn decode_tracking(raw: Option<Vec<u8>>) -> Vec<AccountRecord> {
    let entries = match decode_value(Document::Tracking, raw) {
        Some(Value::Array(entries)) => entries,
        Some(_) => {
            log::error!(target: "warden", "{} does not contain a list. Using an empty ledger", Document::Tracking);
            return Vec::new();
        }
        None => return Vec::new(),
    };

    entries
        .into_iter()
        .filter_map(
            |entry| match serde_json::from_value::<AccountRecord>(entry.clone()) {
                Ok(record) => Some(record),
                Err(err) => {
                    log::warn!(target: "warden", "Invalid entry in {}: {} ({})", Document::Tracking, entry, err);
                    None
                }
            },
        )
        .collect()
}

/// Decodes the manager allowlist, skipping anything that is not an identity
pub fn decode_allowlist(raw: Option<Vec<u8>>) -> Vec<ActorId> {
    let entries = match decode_value(Document::Allowlist, raw) {
        Some(Value::Array(entries)) => entries,
        Some(_) => {
            log::error!(target: "warden", "{} does not contain a list. Using an empty allowlist", Document::Allowlist);
            return Vec::new();
        }
        None => return Vec::new(),
    };

    let mut managers = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry.as_u64() {
            Some(actor) if !managers.contains(&actor) => managers.push(actor),
            Some(actor) => {
                log::warn!(target: "warden", "Duplicate identity {} in {}", actor, Document::Allowlist)
            }
            None => {
                log::warn!(target: "warden", "Invalid entry in {}: {}", Document::Allowlist, entry)
            }
        }
    }

    managers
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn seed() -> Vec<AccountId> {
        vec!["root".into()]
    }

    #[rstest]
    #[case(None)]
    #[case(Some(""))]
    #[case(Some("  \n"))]
    #[case(Some("{not json"))]
    #[case(Some("[1, 2, 3]"))]
    #[case(Some(r#"{"auth": {"mode": "passwords"}}"#))]
    fn config_falls_back_to_default(#[case] raw: Option<&str>) {
        let config = decode_config(raw.map(|r| r.as_bytes().to_vec()), &seed());
        assert_eq!(config, PrimaryConfig::with_seed(&seed()));
    }

    #[test]
    fn tracking_filters_invalid_entries() {
        let raw = br#"[
            {"username_or_id": "alice", "creator_id": 1, "creation_date": "2024-01-01 00:00:00", "expiration_date": "2024-01-31 00:00:00"},
            {"username_or_id": "ghost"},
            {"creator_id": 3},
            "garbage",
            {"username_or_id": 99, "creator_id": 2}
        ]"#;
        let records = decode_tracking(Some(raw.to_vec()));
        let ids: Vec<_> = records.iter().map(|r| r.identifier.to_string()).collect();
        assert_eq!(ids, ["alice", "99"]);
    }

    #[rstest]
    #[case(None)]
    #[case(Some("{}"))]
    #[case(Some("oops"))]
    fn tracking_defaults_to_empty(#[case] raw: Option<&str>) {
        assert!(decode_tracking(raw.map(|r| r.as_bytes().to_vec())).is_empty());
    }

    #[test]
    fn allowlist_keeps_unique_integers() {
        let managers = decode_allowlist(Some(br#"[5, "6", 7, 5, -1, 8.5]"#.to_vec()));
        assert_eq!(managers, vec![5, 7]);
    }

    #[test]
    fn documents_end_with_newline() {
        let bytes = vec![1u64, 2].serialize_to_document(Document::Allowlist).unwrap();
        assert!(bytes.ends_with(b"]\n"));
    }
}
