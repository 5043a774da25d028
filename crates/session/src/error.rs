//! Session error model.

use medgate_core::DomainError;
use thiserror::Error;

use crate::types::FieldErrors;

/// Fallback sign-in message when the backend gives no detail.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid credentials.";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("credential store unavailable: {0}")]
    Unavailable(String),
    #[error("credential store query failed: {0}")]
    Query(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Query(err.to_string())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The login endpoint rejected the username/password pair.
    #[error("invalid credentials: {detail}")]
    InvalidCredentials { detail: String },

    /// The backend rejected one or more submitted fields.
    #[error("validation failed: {0:?}")]
    Validation(FieldErrors),

    /// Rejected locally before any network call.
    #[error(transparent)]
    InvalidInput(#[from] DomainError),

    #[error("API error ({status}): {detail}")]
    Api { status: u16, detail: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Sign-in succeeded but the identity endpoint could not confirm who we are.
    #[error("identity could not be confirmed: {0}")]
    IdentityUnavailable(#[source] Box<SessionError>),

    /// A later logout completed first; this result was discarded.
    #[error("superseded by a later session change")]
    Superseded,
}

impl SessionError {
    pub fn is_invalid_credentials(&self) -> bool {
        matches!(self, SessionError::InvalidCredentials { .. })
    }

    /// Transport-level failure (no response, or an unreadable one).
    pub fn is_transport(&self) -> bool {
        matches!(self, SessionError::Network(_) | SessionError::Parse(_))
    }

    /// Text a sign-in or registration form shows for this error.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::InvalidCredentials { detail } if !detail.trim().is_empty() => detail.clone(),
            SessionError::InvalidCredentials { .. } => INVALID_CREDENTIALS_MESSAGE.to_string(),
            SessionError::Validation(fields) => fields
                .iter()
                .map(|(field, messages)| format!("{field}: {}", messages.join(" ")))
                .collect::<Vec<_>>()
                .join("\n"),
            SessionError::InvalidInput(DomainError::Validation(msg)) => msg.clone(),
            SessionError::Network(_) => "Cannot reach the server. Check your connection.".to_string(),
            SessionError::IdentityUnavailable(_) => {
                "Signed in, but your account could not be loaded. Please try again.".to_string()
            }
            other => other.to_string(),
        }
    }
}
