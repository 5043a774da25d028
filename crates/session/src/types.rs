//! Records exchanged with the backend and kept in the credential store.

use std::collections::BTreeMap;

use medgate_auth::{Identity, Role};
use medgate_core::{AccountId, DomainError, DomainResult};
use serde::{Deserialize, Serialize};

/// Minimum password length the backend accepts at registration.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Field name → validation messages, as returned by the backend on 400.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// The persisted credential record.
///
/// Always written and cleared as one unit: a store never holds an access
/// credential without its refresh credential and hints.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access: String,
    pub refresh: String,
    pub role_hint: Option<Role>,
    pub display_name: Option<String>,
}

impl Credentials {
    /// Record for a freshly issued token pair, with hints taken from the
    /// authoritative identity.
    pub fn issued(tokens: TokenPair, identity: &Identity) -> Self {
        Self {
            access: tokens.access,
            refresh: tokens.refresh,
            role_hint: Some(identity.role),
            display_name: Some(identity.display_name().to_string()),
        }
    }

    /// Same tokens, hints replaced from a newer identity.
    pub fn with_hints(&self, identity: &Identity) -> Self {
        Self {
            access: self.access.clone(),
            refresh: self.refresh.clone(),
            role_hint: Some(identity.role),
            display_name: Some(identity.display_name().to_string()),
        }
    }
}

impl core::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Credentials")
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .field("role_hint", &self.role_hint)
            .field("display_name", &self.display_name)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Bearer credentials issued by the login endpoint.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

impl core::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("TokenPair { .. }")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LogoutRequest<'a> {
    pub refresh: &'a str,
}

/// Account registration form.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub password: String,
}

impl Registration {
    pub fn new(username: impl Into<String>, password: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            role,
            password: password.into(),
        }
    }

    /// Checks the backend would reject anyway, done before any network call.
    pub fn validate(&self) -> DomainResult<()> {
        if self.username.trim().is_empty() {
            return Err(DomainError::validation("username is required"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(DomainError::validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if !self.email.is_empty() && !self.email.contains('@') {
            return Err(DomainError::validation("email is not a valid address"));
        }
        Ok(())
    }
}

impl core::fmt::Debug for Registration {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Registration")
            .field("username", &self.username)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

/// Confirmation returned by the registration endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredAccount {
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
