//! Validated identifier newtypes shared by extension contracts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::validation::{IdentifierRules, ValidationError};

/// Identifier of a conversational session, handed to plugins at invocation time.
///
/// ```rust
/// use capstan_core::SessionId;
///
/// let id = SessionId::parse("session_abc123").unwrap();
/// assert_eq!(id.as_str(), "session_abc123");
/// assert!(SessionId::parse("../etc").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        IdentifierRules::SESSION_ID.validate(input).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SessionId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SessionId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_serde_rejects_invalid_values() {
        let ok: SessionId = serde_json::from_str("\"abc-1\"").unwrap();
        assert_eq!(ok.as_str(), "abc-1");

        let bad = serde_json::from_str::<SessionId>("\"has space\"");
        assert!(bad.is_err());
    }

    #[test]
    fn session_id_from_str() {
        let id: SessionId = "s1".parse().unwrap();
        assert_eq!(id.to_string(), "s1");
    }
}
