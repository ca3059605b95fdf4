//! Caller identity as seen by the restoration service.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque unique identifier of an authenticated caller.
///
/// The nil id is reserved for the anonymous caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Principal(Uuid);

/// Principal text could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PrincipalParseError {
    #[error("principal text is empty")]
    Empty,

    #[error("not a valid principal id: {0}")]
    Malformed(String),
}

impl Principal {
    #[must_use]
    pub const fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// The principal every unauthenticated call is made under.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self(Uuid::nil())
    }

    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.0.is_nil()
    }

    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Parse principal text as typed by an operator.
    ///
    /// Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`PrincipalParseError`] if the text is blank or not a valid id.
    pub fn from_text(text: &str) -> Result<Self, PrincipalParseError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(PrincipalParseError::Empty);
        }
        Uuid::parse_str(trimmed)
            .map(Self)
            .map_err(|_| PrincipalParseError::Malformed(trimmed.to_owned()))
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl FromStr for Principal {
    type Err = PrincipalParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_text(s)
    }
}

impl TryFrom<String> for Principal {
    type Error = PrincipalParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_text(&value)
    }
}

impl From<Principal> for String {
    fn from(value: Principal) -> Self {
        value.to_string()
    }
}
