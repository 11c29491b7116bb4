//! # Daemon Configuration
//!
//! The document the VPN daemon reads. Only `auth.config`, the ordered list of active
//! identifiers, belongs to the warden; every other key (listen address, certificate
//! paths, obfuscation tag, and whatever a newer daemon adds) is carried through untouched
//! and written back in its original order.
//!
//! ```text
//! {
//!   "listen": ":5667",
//!   "cert": "/etc/zivpn/zivpn.crt",
//!   "key": "/etc/zivpn/zivpn.key",
//!   "obfs": "zivpn",
//!   "auth": { "mode": "passwords", "config": ["root", "alice"] }
//! }
//! ```
//!
//! Entries of `auth.config` that are neither a string nor an unsigned integer are not
//! accounts the warden can manage; they keep their place and value across saves.

use crate::backend::Document;
use crate::misc::AccountError;
use serde_json::{json, Map, Value};
use warden_types::prelude::AccountId;

const AUTH_KEY: &str = "auth";
const ACTIVE_LIST_KEY: &str = "config";

/// One entry of `auth.config`
#[derive(Clone, Debug, PartialEq)]
enum ActiveEntry {
    Account(AccountId),
    /// Written back exactly as read
    Opaque(Value),
}

impl ActiveEntry {
    fn account(&self) -> Option<&AccountId> {
        match self {
            ActiveEntry::Account(id) => Some(id),
            ActiveEntry::Opaque(_) => None,
        }
    }

    fn to_value(&self) -> Value {
        match self {
            ActiveEntry::Account(AccountId::ID(id)) => Value::from(*id),
            ActiveEntry::Account(AccountId::Username(name)) => Value::from(name.as_str()),
            ActiveEntry::Opaque(value) => value.clone(),
        }
    }
}

/// The parsed daemon configuration
#[derive(Clone, Debug, PartialEq)]
pub struct PrimaryConfig {
    document: Map<String, Value>,
    active: Vec<ActiveEntry>,
}

impl PrimaryConfig {
    /// A minimal working daemon configuration with `seed` as its active list
    pub fn with_seed(seed: &[AccountId]) -> Self {
        let document = json!({
            "listen": ":5667",
            "cert": "/etc/zivpn/zivpn.crt",
            "key": "/etc/zivpn/zivpn.key",
            "obfs": "zivpn",
            "auth": {
                "mode": "passwords",
                "config": []
            }
        });

        let document = match document {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        Self {
            document,
            active: seed.iter().cloned().map(ActiveEntry::Account).collect(),
        }
    }

    /// Validates the shape of a decoded document: an object holding an `auth` object
    /// whose `config` is an array
    pub fn from_value(value: Value) -> Result<Self, AccountError> {
        let document = match value {
            Value::Object(map) => map,
            other => {
                return Err(AccountError::storage(
                    Document::Config,
                    format!("expected a JSON object at the top level, found {}", kind(&other)),
                ))
            }
        };

        let list = document
            .get(AUTH_KEY)
            .and_then(Value::as_object)
            .and_then(|auth| auth.get(ACTIVE_LIST_KEY))
            .and_then(Value::as_array)
            .ok_or_else(|| {
                AccountError::storage(Document::Config, "missing the auth.config list")
            })?;

        let active = list
            .iter()
            .map(|entry| match serde_json::from_value::<AccountId>(entry.clone()) {
                Ok(id) => ActiveEntry::Account(id),
                Err(_) => {
                    log::warn!(target: "warden", "Keeping unmanageable entry {} of auth.config as is", entry);
                    ActiveEntry::Opaque(entry.clone())
                }
            })
            .collect();

        Ok(Self { document, active })
    }

    /// The full document, ready to be written
    pub fn to_value(&self) -> Value {
        let mut document = self.document.clone();
        let active = Value::Array(self.active.iter().map(ActiveEntry::to_value).collect());

        match document.get_mut(AUTH_KEY).and_then(Value::as_object_mut) {
            Some(auth) => {
                let _ = auth.insert(ACTIVE_LIST_KEY.to_string(), active);
            }
            None => {
                let mut auth = Map::new();
                let _ = auth.insert("mode".to_string(), Value::from("passwords"));
                let _ = auth.insert(ACTIVE_LIST_KEY.to_string(), active);
                let _ = document.insert(AUTH_KEY.to_string(), Value::Object(auth));
            }
        }

        Value::Object(document)
    }

    /// The active identifiers, in daemon order
    pub fn accounts(&self) -> impl Iterator<Item = &AccountId> + '_ {
        self.active.iter().filter_map(ActiveEntry::account)
    }

    /// Like [`Self::accounts`], collected
    pub fn active(&self) -> Vec<AccountId> {
        self.accounts().cloned().collect()
    }

    pub fn contains(&self, id: &AccountId) -> bool {
        self.accounts().any(|active| active == id)
    }

    /// Appends `id` to the active list. Returns false if it was already active
    pub fn activate(&mut self, id: AccountId) -> bool {
        if self.contains(&id) {
            return false;
        }

        self.active.push(ActiveEntry::Account(id));
        true
    }

    /// Removes every occurrence of `id`. Returns false if it was not active
    pub fn deactivate(&mut self, id: &AccountId) -> bool {
        let before = self.active.len();
        self.active.retain(|entry| entry.account() != Some(id));
        before != self.active.len()
    }

    /// The `auth.mode` value the daemon uses
    pub fn auth_mode(&self) -> Option<&str> {
        self.document
            .get(AUTH_KEY)
            .and_then(|auth| auth.get("mode"))
            .and_then(Value::as_str)
    }

    /// A daemon setting outside of `auth`
    pub fn setting(&self, key: &str) -> Option<&Value> {
        self.document.get(key)
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "listen": ":6000",
        "cert": "/tmp/c.crt",
        "key": "/tmp/c.key",
        "obfs": "custom",
        "auth": { "mode": "passwords", "config": ["root", "alice", 42] },
        "extra": { "nested": true }
    }"#;

    #[test]
    fn preserves_opaque_fields_and_order() {
        let value: Value = serde_json::from_str(SAMPLE).unwrap();
        let mut config = PrimaryConfig::from_value(value.clone()).unwrap();
        assert_eq!(config.active().len(), 3);
        assert!(config.contains(&AccountId::ID(42)));
        assert_eq!(config.auth_mode(), Some("passwords"));

        assert!(config.activate("bob".into()));
        assert!(config.deactivate(&"bob".into()));
        assert_eq!(config.to_value(), value);

        let keys: Vec<_> = config
            .to_value()
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(keys, ["listen", "cert", "key", "obfs", "auth", "extra"]);
    }

    #[test]
    fn unmanageable_entries_survive_a_save() {
        let raw = r#"{"auth": {"mode": "passwords", "config": ["root", null, {"user": "x"}, -3, "bob"]}}"#;
        let value: Value = serde_json::from_str(raw).unwrap();
        let mut config = PrimaryConfig::from_value(value.clone()).unwrap();
        assert_eq!(config.active(), &[AccountId::from("root"), AccountId::from("bob")]);

        assert!(config.deactivate(&"bob".into()));
        assert!(config.activate("carol".into()));
        assert_eq!(
            config.to_value()["auth"]["config"],
            serde_json::json!(["root", null, {"user": "x"}, -3, "carol"])
        );

        assert!(config.deactivate(&"carol".into()));
        assert!(config.activate("bob".into()));
        assert_eq!(config.to_value(), value);
    }

    #[test]
    fn rejects_wrong_shapes() {
        for raw in [
            "[]",
            r#"{"listen": ":1"}"#,
            r#"{"auth": {"mode": "passwords"}}"#,
            r#"{"auth": {"config": "root"}}"#,
        ] {
            let value: Value = serde_json::from_str(raw).unwrap();
            assert!(PrimaryConfig::from_value(value).is_err(), "{raw}");
        }
    }

    #[test]
    fn activate_is_idempotent() {
        let mut config = PrimaryConfig::with_seed(&["root".into()]);
        assert!(!config.activate("root".into()));
        assert_eq!(config.active(), &[AccountId::from("root")]);
        assert_eq!(
            config.to_value()["auth"]["config"],
            serde_json::json!(["root"])
        );
    }
}
