//! Test doubles: a scripted [`AuthBackend`] and a failing [`CredentialStore`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use medgate_auth::{Identity, Role};
use medgate_core::AccountId;
use tokio::sync::Semaphore;

use crate::backend::AuthBackend;
use crate::error::{SessionError, StoreError};
use crate::store::CredentialStore;
use crate::types::{Credentials, RegisteredAccount, Registration, TokenPair};

pub(crate) fn identity(id: i64, username: &str, first_name: Option<&str>, role: Role) -> Identity {
    Identity {
        id: AccountId::new(id),
        username: username.to_string(),
        first_name: first_name.map(str::to_string),
        last_name: None,
        email: None,
        role,
    }
}

/// Three-segment bearer token whose payload carries the given claims.
pub(crate) fn token_for(role: Option<&str>, username: Option<&str>) -> String {
    let mut claims = serde_json::Map::new();
    if let Some(role) = role {
        claims.insert("role".to_string(), role.into());
    }
    if let Some(username) = username {
        claims.insert("username".to_string(), username.into());
    }
    let payload = URL_SAFE_NO_PAD.encode(serde_json::Value::Object(claims).to_string());
    format!("eyJhbGciOiJIUzI1NiJ9.{payload}.sig")
}

#[derive(Default)]
pub(crate) struct FakeBackend {
    accounts: Mutex<HashMap<String, (String, TokenPair)>>,
    identities: Mutex<HashMap<String, Identity>>,
    me_error: Mutex<Option<SessionError>>,
    logout_error: Mutex<Option<SessionError>>,
    me_gate: Mutex<Option<Arc<Semaphore>>>,
    token_gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    revoked: Mutex<Vec<String>>,
    register_calls: AtomicUsize,
    login_calls: AtomicUsize,
    logout_calls: AtomicUsize,
    me_calls: AtomicUsize,
}

impl FakeBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Make `access` resolve to `identity` on the identity endpoint.
    pub(crate) fn add_identity(&self, access: &str, identity: Identity) {
        self.identities.lock().unwrap().insert(access.to_string(), identity);
    }

    /// Register a login; returns the access token it will issue.
    pub(crate) fn add_account(&self, username: &str, password: &str, identity: Identity) -> String {
        let access = token_for(Some(identity.role.as_str()), Some(username));
        let tokens = TokenPair {
            access: access.clone(),
            refresh: format!("{username}-refresh"),
        };
        self.accounts
            .lock()
            .unwrap()
            .insert(username.to_string(), (password.to_string(), tokens));
        self.add_identity(&access, identity);
        access
    }

    pub(crate) fn fail_me(&self, err: SessionError) {
        *self.me_error.lock().unwrap() = Some(err);
    }

    pub(crate) fn fail_logout(&self, err: SessionError) {
        *self.logout_error.lock().unwrap() = Some(err);
    }

    /// Hold every identity fetch until a permit is added to the returned gate.
    pub(crate) fn hold_me(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.me_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Hold identity fetches for one access token only.
    pub(crate) fn hold_me_for(&self, access: &str) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.token_gates.lock().unwrap().insert(access.to_string(), gate.clone());
        gate
    }

    pub(crate) fn revoked(&self) -> Vec<String> {
        self.revoked.lock().unwrap().clone()
    }

    pub(crate) fn register_calls(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn me_calls(&self) -> usize {
        self.me_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.register_calls() + self.login_calls.load(Ordering::SeqCst) + self.logout_calls() + self.me_calls()
    }
}

#[async_trait]
impl AuthBackend for FakeBackend {
    async fn register(&self, registration: &Registration) -> Result<RegisteredAccount, SessionError> {
        let n = self.register_calls.fetch_add(1, Ordering::SeqCst) as i64;
        Ok(RegisteredAccount {
            id: AccountId::new(100 + n),
            username: registration.username.clone(),
            first_name: None,
            last_name: None,
            email: None,
            role: registration.role,
        })
    }

    async fn login(&self, username: &str, password: &str) -> Result<TokenPair, SessionError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        match self.accounts.lock().unwrap().get(username) {
            Some((expected, tokens)) if expected == password => Ok(tokens.clone()),
            _ => Err(SessionError::InvalidCredentials {
                detail: "No active account found with the given credentials".to_string(),
            }),
        }
    }

    async fn logout(&self, _access: &str, refresh: &str) -> Result<(), SessionError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.logout_error.lock().unwrap().clone() {
            return Err(err);
        }
        self.revoked.lock().unwrap().push(refresh.to_string());
        Ok(())
    }

    async fn me(&self, access: &str) -> Result<Identity, SessionError> {
        self.me_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        let gate = self
            .token_gates
            .lock()
            .unwrap()
            .get(access)
            .cloned()
            .or_else(|| self.me_gate.lock().unwrap().clone());
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }

        if let Some(err) = self.me_error.lock().unwrap().clone() {
            return Err(err);
        }
        self.identities
            .lock()
            .unwrap()
            .get(access)
            .cloned()
            .ok_or_else(|| SessionError::Api {
                status: 401,
                detail: "Given token not valid for any token type".to_string(),
            })
    }
}

/// A store whose every operation fails, as when the database file is gone.
#[derive(Default)]
pub(crate) struct UnavailableStore {
    clear_calls: AtomicUsize,
}

impl UnavailableStore {
    pub(crate) fn clear_calls(&self) -> usize {
        self.clear_calls.load(Ordering::SeqCst)
    }

    fn unavailable() -> StoreError {
        StoreError::Unavailable("unable to open database file".to_string())
    }
}

#[async_trait]
impl CredentialStore for UnavailableStore {
    async fn read(&self) -> Result<Option<Credentials>, StoreError> {
        Err(Self::unavailable())
    }

    async fn put(&self, _credentials: &Credentials) -> Result<(), StoreError> {
        Err(Self::unavailable())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.clear_calls.fetch_add(1, Ordering::SeqCst);
        Err(Self::unavailable())
    }
}
