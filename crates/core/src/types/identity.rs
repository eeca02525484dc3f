//! Signed-in user identity.
//!
//! The marketplace API issues credentials whose identity claim may be either
//! a numeric primary key (`"user_id": 12`) or an opaque subject string
//! (`"sub": "a1b2"`). [`UserId`] keeps whichever form the server chose.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of the signed-in user, as carried in the credential claims.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    /// Numeric database identifier.
    Numeric(i64),
    /// Opaque subject identifier.
    Text(String),
}

impl UserId {
    /// Build an identity from a JSON claim value.
    ///
    /// Returns `None` for values that cannot identify anyone: `null`,
    /// booleans, empty strings, zero, non-integral numbers, arrays and
    /// objects.
    #[must_use]
    pub fn from_claim(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_i64().filter(|id| *id != 0).map(Self::Numeric),
            serde_json::Value::String(s) if !s.is_empty() => Some(Self::Text(s.clone())),
            _ => None,
        }
    }

    /// Numeric form, when the server uses integer keys.
    #[must_use]
    pub const fn as_numeric(&self) -> Option<i64> {
        match self {
            Self::Numeric(id) => Some(*id),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(id) => write!(f, "{id}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self::Numeric(id)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_owned())
    }
}
