use crate::errors::Error;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// The identity of whoever issues a command (a chat user id)
pub type ActorId = u64;

/// An entry in the daemon's active list. The daemon accepts both textual usernames
/// and bare numeric identifiers, so both are kept in the shape they were written in.
///
/// Two identifiers are equal when their textual forms are equal, so `ID(42)` and
/// `Username("42")` refer to the same account. Comparison is case-sensitive.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AccountId {
    /// Raw numeric account id
    ID(u64),
    /// A username
    Username(String),
}

impl AccountId {
    /// Parses a command argument. All-digit arguments become [`AccountId::ID`]
    pub fn parse<T: AsRef<str>>(raw: T) -> Result<Self, Error> {
        let raw = raw.as_ref().trim();
        if raw.is_empty() {
            return Err(Error::EmptyIdentifier);
        }

        if raw.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(id) = raw.parse::<u64>() {
                return Ok(Self::ID(id));
            }
        }

        Ok(Self::Username(raw.to_string()))
    }

    /// The textual form used for equality, display and the daemon
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::ID(id) => Cow::Owned(id.to_string()),
            Self::Username(name) => Cow::Borrowed(name.as_str()),
        }
    }

    /// Key used when listing accounts (case-insensitive ordering)
    pub fn sort_key(&self) -> String {
        self.as_text().to_lowercase()
    }

    /// Whether this identifier equals the reserved `protected` value, ignoring case
    pub fn is_reserved(&self, protected: &str) -> bool {
        self.as_text().eq_ignore_ascii_case(protected)
    }
}

impl PartialEq for AccountId {
    fn eq(&self, other: &Self) -> bool {
        self.as_text() == other.as_text()
    }
}

impl Eq for AccountId {}

impl Hash for AccountId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_text().hash(state)
    }
}

impl Display for AccountId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_text())
    }
}

impl FromStr for AccountId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<String> for AccountId {
    fn from(username: String) -> Self {
        Self::Username(username)
    }
}

impl From<&str> for AccountId {
    fn from(username: &str) -> Self {
        Self::Username(username.to_string())
    }
}

impl From<u64> for AccountId {
    fn from(id: u64) -> Self {
        Self::ID(id)
    }
}

/// Parses the numeric identity of an actor (e.g., the target of a grant)
pub fn parse_actor_id<T: AsRef<str>>(raw: T) -> Result<ActorId, Error> {
    let raw = raw.as_ref().trim();
    raw.parse::<ActorId>()
        .map_err(|_| Error::InvalidActor(raw.to_string()))
}

/// What an authorized actor is allowed to do
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// The single configured super-admin. Manages every account
    SuperAdmin,
    /// An allowlisted manager. Manages only the accounts it created
    Manager,
}

/// The privilege a command requires before it reaches the ledger
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CommandScope {
    /// Anyone may invoke it (help, greeting)
    Open,
    /// Managers and the super-admin
    Management,
    /// Only the super-admin
    SuperAdmin,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("alice", AccountId::Username("alice".into()))]
    #[case("  bob ", AccountId::Username("bob".into()))]
    #[case("1234", AccountId::ID(1234))]
    #[case("12ab", AccountId::Username("12ab".into()))]
    fn parses_arguments(#[case] raw: &str, #[case] expected: AccountId) {
        let parsed = AccountId::parse(raw).unwrap();
        assert_eq!(parsed, expected);
        assert_eq!(
            std::mem::discriminant(&parsed),
            std::mem::discriminant(&expected)
        );
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn rejects_blank(#[case] raw: &str) {
        assert_eq!(AccountId::parse(raw), Err(Error::EmptyIdentifier));
    }

    #[test]
    fn numeric_and_text_forms_are_equal() {
        assert_eq!(AccountId::ID(42), AccountId::Username("42".into()));
        assert_ne!(AccountId::from("Alice"), AccountId::from("alice"));
    }

    #[test]
    fn untagged_json_shape() {
        let ids: Vec<AccountId> = serde_json::from_str(r#"["root", 77]"#).unwrap();
        assert_eq!(ids, vec![AccountId::from("root"), AccountId::ID(77)]);
        assert_eq!(serde_json::to_string(&ids).unwrap(), r#"["root",77]"#);
    }

    #[test]
    fn reserved_ignores_case() {
        assert!(AccountId::from("ROOT").is_reserved("root"));
        assert!(!AccountId::from("rooted").is_reserved("root"));
    }

    #[test]
    fn actor_ids() {
        assert_eq!(parse_actor_id(" 555 "), Ok(555));
        assert!(matches!(parse_actor_id("abc"), Err(Error::InvalidActor(_))));
    }
}
