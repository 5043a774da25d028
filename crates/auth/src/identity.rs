use serde::{Deserialize, Serialize};

use medgate_core::AccountId;

use crate::Role;

/// Server-confirmed record of the signed-in principal.
///
/// Only ever built from an identity endpoint response and only ever replaced
/// wholesale. This is the sole input to authorization decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: AccountId,
    pub username: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub role: Role,
}

impl Identity {
    /// First name when set, otherwise the username.
    pub fn display_name(&self) -> &str {
        match self.first_name.as_deref().map(str::trim) {
            Some(first) if !first.is_empty() => first,
            _ => &self.username,
        }
    }

    /// Name as shown in the navigation bar ("Dr. Smith" for doctors).
    pub fn display_label(&self) -> String {
        match self.role {
            Role::Doctor => format!("Dr. {}", self.display_name()),
            _ => self.display_name().to_string(),
        }
    }
}

/// Who is signed in, as far as authorization is concerned.
///
/// Derived from credential presence and reconciliation outcome; never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Startup reconciliation has not finished.
    #[default]
    Loading,
    Unauthenticated,
    Authenticated(Identity),
}

impl SessionState {
    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Loading)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionState::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }
}
