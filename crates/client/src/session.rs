//! Session manager: the single source of truth for who is signed in.
//!
//! # State machine
//!
//! ```text
//!                initialize()
//! Initializing ──────────────┬──> Authenticated(user)
//!                            └──> Anonymous
//!
//! login(token) ──> Authenticated(user)    token decodes to an identity
//!              └─> Unidentified           token persisted but carries no identity
//! logout()     ──> Anonymous
//! ```
//!
//! The manager is the only component that touches the [`TokenStore`] and the
//! only one that configures the transport bearer. Consumers observe
//! [`SessionState`] snapshots and never see the raw credential.
//!
//! Outside this crate the manager is read-only. Every transition is driven
//! by [`Storefront`](crate::Storefront) so the cart and order history follow
//! it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use craftify_core::{Credential, UserId};
use secrecy::SecretString;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::api::{ApiError, MarketplaceApi, SignUp};
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::token::{TokenStore, decode_identity};

/// Errors from session mutations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The credential was accepted and stored but carries no user identity.
    #[error("Signed in, but the credential does not identify a user")]
    UnidentifiableCredential,

    /// The login or sign-up request failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionPhase {
    /// Persisted storage has not been checked yet.
    #[default]
    Initializing,
    /// A credential with a decodable identity is active.
    Authenticated(UserId),
    /// A credential was stored but no identity could be read from it.
    Unidentified,
    /// No usable credential.
    Anonymous,
}

impl SessionPhase {
    #[must_use]
    pub const fn user_id(&self) -> Option<&UserId> {
        match self {
            Self::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}

/// Snapshot of the session as seen by views.
///
/// `is_authenticated()` holds exactly when `user_id()` is `Some`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub phase: SessionPhase,
    /// Message from the last failed session operation.
    pub error: Option<String>,
}

impl SessionState {
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self.phase, SessionPhase::Authenticated(_))
    }

    #[must_use]
    pub const fn user_id(&self) -> Option<&UserId> {
        self.phase.user_id()
    }

    /// While true, an unauthenticated reading is not final.
    #[must_use]
    pub const fn initializing(&self) -> bool {
        matches!(self.phase, SessionPhase::Initializing)
    }
}

/// Owns the persisted credential and publishes the session state.
pub struct SessionManager<S, A> {
    store: S,
    api: Arc<A>,
    state: watch::Sender<SessionState>,
    initialized: AtomicBool,
}

impl<S: TokenStore, A: MarketplaceApi> SessionManager<S, A> {
    /// Create a manager in the `Initializing` phase.
    pub(crate) fn new(store: S, api: Arc<A>) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            store,
            api,
            state,
            initialized: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.state.borrow().phase.clone()
    }

    /// Subscribe to session changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Read the persisted credential and leave the `Initializing` phase.
    ///
    /// Runs once; later calls return the current phase unchanged. A stored
    /// credential that does not decode is removed and the session starts
    /// anonymous.
    #[instrument(skip(self))]
    pub(crate) fn initialize(&self) -> SessionPhase {
        if self.initialized.swap(true, Ordering::AcqRel) {
            return self.phase();
        }

        let stored = match self.store.load() {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "Failed to read stored credential, starting anonymous");
                None
            }
        };

        let phase = match stored {
            Some(credential) => match decode_identity(credential.expose()) {
                Some(user) => {
                    self.api.authorize(Some(credential));
                    set_sentry_user(&user, None);
                    info!(user_id = %user, "Restored session");
                    SessionPhase::Authenticated(user)
                }
                None => {
                    warn!("Stored credential carries no identity, discarding it");
                    self.clear_store();
                    SessionPhase::Anonymous
                }
            },
            None => {
                debug!("No stored credential");
                SessionPhase::Anonymous
            }
        };

        self.state.send_replace(SessionState {
            phase: phase.clone(),
            error: None,
        });
        phase
    }

    /// Adopt a credential issued by the server.
    ///
    /// The credential is persisted and configured on the transport. If it
    /// carries no identity the session enters `Unidentified` and the caller
    /// decides how to recover (the storefront forces a logout).
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UnidentifiableCredential` when no identity
    /// claim can be decoded.
    #[instrument(skip(self, credential))]
    pub(crate) fn login(&self, credential: Credential) -> Result<UserId, SessionError> {
        if let Err(e) = self.store.save(&credential) {
            warn!(error = %e, "Failed to persist credential, session will not survive restart");
        }
        self.initialized.store(true, Ordering::Release);

        if let Some(user) = decode_identity(credential.expose()) {
            self.api.authorize(Some(credential));
            set_sentry_user(&user, None);
            info!(user_id = %user, "Signed in");
            self.state.send_replace(SessionState {
                phase: SessionPhase::Authenticated(user.clone()),
                error: None,
            });
            return Ok(user);
        }

        warn!("Credential accepted but carries no identity claim");
        self.api.authorize(None);
        let err = SessionError::UnidentifiableCredential;
        self.state.send_replace(SessionState {
            phase: SessionPhase::Unidentified,
            error: Some(err.to_string()),
        });
        Err(err)
    }

    /// Exchange a username and password for a credential and adopt it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Api` if the server rejects the login, or the
    /// errors of [`Self::login`].
    #[instrument(skip(self, password))]
    pub(crate) async fn sign_in(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<UserId, SessionError> {
        self.clear_error();
        let credential = self
            .api
            .login(username, password)
            .await
            .map_err(|e| self.record_error(e.into()))?;
        self.login(credential)
    }

    /// Register an account and adopt the credential it returns.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Api` if registration fails, or the errors of
    /// [`Self::login`].
    #[instrument(skip(self, form), fields(username = %form.username))]
    pub(crate) async fn sign_up(&self, form: &SignUp) -> Result<UserId, SessionError> {
        self.clear_error();
        let credential = self
            .api
            .sign_up(form)
            .await
            .map_err(|e| self.record_error(e.into()))?;
        self.login(credential)
    }

    /// Remove the credential and return to `Anonymous`.
    #[instrument(skip(self))]
    pub(crate) fn logout(&self) {
        self.end_session(None);
        info!("Signed out");
    }

    /// End the session after an unrecoverable session error, keeping the
    /// reason visible to views.
    #[instrument(skip(self))]
    pub(crate) fn force_logout(&self, reason: &str) {
        warn!(reason, "Forcing sign out");
        self.end_session(Some(reason.to_string()));
    }

    fn end_session(&self, error: Option<String>) {
        self.clear_store();
        self.api.authorize(None);
        clear_sentry_user();
        self.initialized.store(true, Ordering::Release);
        self.state.send_replace(SessionState {
            phase: SessionPhase::Anonymous,
            error,
        });
    }

    fn clear_store(&self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to remove stored credential");
        }
    }

    fn clear_error(&self) {
        self.state.send_if_modified(|state| state.error.take().is_some());
    }

    fn record_error(&self, err: SessionError) -> SessionError {
        warn!(error = %err, "Session operation failed");
        self.state
            .send_modify(|state| state.error = Some(err.to_string()));
        err
    }
}
