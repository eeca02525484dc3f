//! Crate-level error type and Sentry helpers.

use thiserror::Error;

use crate::api::ApiError;
use crate::cart::CartError;
use crate::session::SessionError;

/// Errors surfaced by the [`Storefront`](crate::Storefront).
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Cart(#[from] CartError),

    /// The operation needs a signed-in user.
    #[error("Please log in to continue")]
    NotAuthenticated,

    /// The session has not finished reading stored credentials.
    #[error("Session is still initializing")]
    SessionInitializing,

    /// Input rejected before any request was made.
    #[error("{0}")]
    Validation(String),
}

impl ClientError {
    /// Whether the user should be sent to sign in.
    #[must_use]
    pub const fn requires_login(&self) -> bool {
        matches!(
            self,
            Self::NotAuthenticated
                | Self::Cart(CartError::NotAuthenticated)
                | Self::Api(ApiError::Unauthorized)
                | Self::Cart(CartError::Api(ApiError::Unauthorized))
                | Self::Session(SessionError::Api(ApiError::Unauthorized))
                | Self::Session(SessionError::UnidentifiableCredential)
        )
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

// =============================================================================
// Sentry Helpers
// =============================================================================

/// Set the Sentry user context.
///
/// Call this after the session resolves a user so errors are associated
/// with them.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Record a user action for Sentry error reports.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data.unwrap_or_default() {
        breadcrumb.data.insert(
            (*key).to_string(),
            serde_json::Value::String((*value).to_string()),
        );
    }

    sentry::add_breadcrumb(breadcrumb);
}
