//! Credential persistence and identity decoding.
//!
//! The bearer credential is the only piece of client state that survives a
//! restart. It is stored as one opaque string under a single well-known key
//! and is only ever read or written by the [`SessionManager`].
//!
//! [`SessionManager`]: crate::session::SessionManager

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use craftify_core::{Credential, UserId};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

/// Storage key the credential is persisted under.
pub const TOKEN_KEY: &str = "token";

/// Claim names that may carry the user identifier, in lookup order.
pub const IDENTITY_CLAIMS: [&str; 2] = ["user_id", "sub"];

/// URL-safe base64 that accepts both padded and unpadded payloads.
const CLAIMS_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

// =============================================================================
// Errors
// =============================================================================

/// Errors from reading or writing persisted credential storage.
#[derive(Debug, Error)]
pub enum TokenStoreError {
    /// The backing file could not be read or written.
    #[error("token storage I/O error at {path}: {source}")]
    Io {
        /// Path of the backing file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The backing file exists but is not a JSON object.
    #[error("token storage at {path} is corrupt: {reason}")]
    Corrupt {
        /// Path of the backing file.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },
}

/// Reasons a credential's claims could not be decoded.
///
/// Never surfaced to users: an undecodable credential simply means
/// "not authenticated".
#[derive(Debug, Error)]
pub enum CredentialDecodeError {
    /// Fewer than three `.`-separated segments.
    #[error("credential does not have a header.payload.signature structure")]
    Structure,

    /// The payload segment is not valid base64.
    #[error("credential payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The decoded payload is not JSON.
    #[error("credential payload is not JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The decoded payload is JSON but not an object.
    #[error("credential payload is not a claims object")]
    NotAnObject,
}

// =============================================================================
// TokenStore
// =============================================================================

/// Persistent storage for the bearer credential.
pub trait TokenStore: Send + Sync {
    /// Persist the credential, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn save(&self, credential: &Credential) -> Result<(), TokenStoreError>;

    /// Load the previously saved credential, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage exists but cannot be read.
    fn load(&self) -> Result<Option<Credential>, TokenStoreError>;

    /// Remove the persisted credential. Clearing an empty store is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be modified.
    fn clear(&self) -> Result<(), TokenStoreError>;
}

impl<T: TokenStore + ?Sized> TokenStore for Arc<T> {
    fn save(&self, credential: &Credential) -> Result<(), TokenStoreError> {
        (**self).save(credential)
    }

    fn load(&self) -> Result<Option<Credential>, TokenStoreError> {
        (**self).load()
    }

    fn clear(&self) -> Result<(), TokenStoreError> {
        (**self).clear()
    }
}

/// File-backed token store.
///
/// Persists a small JSON object (`{"token": "..."}`) so the credential
/// survives process restarts. On Unix the file is created owner-read/write
/// only.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Create a store backed by the given file. Nothing is touched until the
    /// first `save`, `load` or `clear`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> TokenStoreError {
        TokenStoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl TokenStore for FileTokenStore {
    fn save(&self, credential: &Credential) -> Result<(), TokenStoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let mut document = Map::new();
        document.insert(
            TOKEN_KEY.to_string(),
            Value::String(credential.expose().to_string()),
        );
        let contents = Value::Object(document).to_string();

        std::fs::write(&self.path, contents).map_err(|e| self.io_error(e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .map_err(|e| self.io_error(e))?;
        }

        Ok(())
    }

    fn load(&self) -> Result<Option<Credential>, TokenStoreError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };

        let document: Value =
            serde_json::from_str(&contents).map_err(|e| TokenStoreError::Corrupt {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        let Value::Object(document) = document else {
            return Err(TokenStoreError::Corrupt {
                path: self.path.clone(),
                reason: "expected a JSON object".to_string(),
            });
        };

        Ok(document
            .get(TOKEN_KEY)
            .and_then(Value::as_str)
            .map(Credential::from)
            .filter(|credential| !credential.is_blank()))
    }

    fn clear(&self) -> Result<(), TokenStoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

/// In-memory token store for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<Credential>>,
}

impl MemoryTokenStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds a credential, as if saved by a
    /// previous run.
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(Credential::new(token))),
        }
    }

    /// Whether a credential is currently stored.
    #[must_use]
    pub fn has_token(&self) -> bool {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl TokenStore for MemoryTokenStore {
    fn save(&self, credential: &Credential) -> Result<(), TokenStoreError> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(credential.clone());
        Ok(())
    }

    fn load(&self) -> Result<Option<Credential>, TokenStoreError> {
        Ok(self
            .token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn clear(&self) -> Result<(), TokenStoreError> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

// =============================================================================
// Identity decoding
// =============================================================================

/// Decode the user identity embedded in a credential.
///
/// Returns the first present claim among [`IDENTITY_CLAIMS`] that holds a
/// usable identifier. Never fails: a malformed token, bad base64, non-JSON
/// payload or missing claim all yield `None`.
#[must_use]
pub fn decode_identity(token: &str) -> Option<UserId> {
    match decode_claims(token) {
        Ok(claims) => IDENTITY_CLAIMS
            .iter()
            .find_map(|name| claims.get(*name).and_then(UserId::from_claim)),
        Err(reason) => {
            debug!(%reason, "credential claims could not be decoded");
            None
        }
    }
}

/// Decode the claims object carried in a credential's payload segment.
///
/// # Errors
///
/// Returns a [`CredentialDecodeError`] describing why the payload could not
/// be read.
pub fn decode_claims(token: &str) -> Result<Map<String, Value>, CredentialDecodeError> {
    let mut segments = token.trim().split('.');
    let (Some(_header), Some(payload), Some(_signature)) =
        (segments.next(), segments.next(), segments.next())
    else {
        return Err(CredentialDecodeError::Structure);
    };

    // Tolerate issuers that emit the standard alphabet.
    let payload: String = payload
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();

    let bytes = CLAIMS_ENGINE.decode(payload.as_bytes())?;
    match serde_json::from_slice::<Value>(&bytes)? {
        Value::Object(claims) => Ok(claims),
        _ => Err(CredentialDecodeError::NotAnObject),
    }
}
