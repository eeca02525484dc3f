//! Bearer credential type.
//!
//! Type-safe wrapper for the opaque signed token issued by the marketplace
//! API on login or signup.

use core::fmt;

use secrecy::{ExposeSecret, SecretString};

/// Opaque bearer credential.
///
/// The token is held as a [`SecretString`] so it is zeroized on drop and
/// never shows up in `Debug` output or logs. Only the session layer and the
/// transport should ever call [`Credential::expose`].
#[derive(Clone)]
pub struct Credential(SecretString);

impl Credential {
    /// Wrap a raw token string.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// Borrow the raw token.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Whether the token is blank (empty or whitespace).
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.expose().trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

impl From<String> for Credential {
    fn from(token: String) -> Self {
        Self::new(token)
    }
}

impl From<&str> for Credential {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}
