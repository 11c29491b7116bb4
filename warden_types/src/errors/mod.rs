use std::fmt::{Debug, Display, Formatter};

/// The default error type for this crate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An account identifier was empty or only whitespace
    EmptyIdentifier,
    /// An actor identity could not be parsed as an integer
    InvalidActor(String),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::EmptyIdentifier => write!(f, "The account identifier cannot be empty"),
            Error::InvalidActor(raw) => write!(f, "'{raw}' is not a valid numeric identity"),
        }
    }
}

impl std::error::Error for Error {}
