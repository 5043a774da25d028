//! Session lifecycle: who is signed in, and how that belief changes.
//!
//! State machine: `Loading` → (`Unauthenticated` | `Authenticated`), then
//! `login`/`logout` move between the latter two. The authoritative
//! [`Identity`] only ever comes from the identity endpoint and is replaced
//! wholesale; [`ProvisionalClaims`] decoded from a stored token are published
//! alongside `Loading` for optimistic painting and dropped on every commit.
//!
//! ## Superseded results
//!
//! Network calls are not cancelled. Instead every commit happens under one
//! lock that also holds two epochs:
//! - `generation` moves on every committed login/logout; a startup
//!   reconciliation that started under an older generation is discarded.
//! - `logouts` moves on every logout; a login that started before a logout
//!   that has since committed is discarded and reports `Superseded`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use medgate_auth::{Identity, ProvisionalClaims, Role, SessionState, decode};
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::backend::AuthBackend;
use crate::error::SessionError;
use crate::store::CredentialStore;
use crate::types::{Credentials, RegisteredAccount, Registration};

/// What readers see: the authoritative state plus, while loading, the
/// unverified guess.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub provisional: Option<ProvisionalClaims>,
}

impl SessionSnapshot {
    fn settled(state: SessionState) -> Self {
        Self {
            state,
            provisional: None,
        }
    }

    /// Role to paint with right now: the confirmed one, else the provisional
    /// guess while loading. Never use this for authorization.
    pub fn display_role(&self) -> Option<Role> {
        match &self.state {
            SessionState::Authenticated(identity) => Some(identity.role),
            SessionState::Loading => self.provisional.as_ref().and_then(|c| c.role),
            SessionState::Unauthenticated => None,
        }
    }
}

#[derive(Debug, Default)]
struct Epochs {
    generation: u64,
    logouts: u64,
}

/// Owner of the authoritative identity.
///
/// Share it behind an `Arc`; every method takes `&self`.
pub struct SessionManager {
    store: Arc<dyn CredentialStore>,
    backend: Arc<dyn AuthBackend>,
    state: watch::Sender<SessionSnapshot>,
    epochs: Mutex<Epochs>,
    initialized: AtomicBool,
}

impl core::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &*self.state.borrow())
            .field("initialized", &self.initialized.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    pub fn new(store: Arc<dyn CredentialStore>, backend: Arc<dyn AuthBackend>) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::default());
        Self {
            store,
            backend,
            state,
            epochs: Mutex::new(Epochs::default()),
            initialized: AtomicBool::new(false),
        }
    }

    /// Current state (cheap clone of the latest snapshot).
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// Receiver that observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    /// Stored bearer credential, for clients of the other API resources.
    pub async fn access_token(&self) -> Result<Option<String>, SessionError> {
        Ok(self.store.read().await?.map(|c| c.access))
    }

    /// Startup reconciliation. Runs once; later calls return the current
    /// snapshot untouched.
    pub async fn init(&self) -> SessionSnapshot {
        if self.initialized.swap(true, Ordering::SeqCst) {
            warn!("session init called more than once; ignoring");
            return self.snapshot();
        }

        let started = self.epochs.lock().await.generation;

        let stored = match self.store.read().await {
            Ok(stored) => stored,
            Err(err) => {
                warn!(error = %err, "credential store unreadable at startup; signing out");
                self.reconcile_failed(started).await;
                return self.snapshot();
            }
        };

        let Some(credentials) = stored else {
            let epochs = self.epochs.lock().await;
            if epochs.generation == started {
                info!("no stored credentials; starting signed out");
                self.publish(SessionState::Unauthenticated);
            }
            drop(epochs);
            return self.snapshot();
        };

        let provisional = decode(&credentials.access);
        {
            let epochs = self.epochs.lock().await;
            if epochs.generation == started {
                debug!(role = ?provisional.role, "provisional claims from stored token");
                self.state.send_modify(|s| {
                    s.provisional = (!provisional.is_empty()).then_some(provisional);
                });
            }
        }

        match self.backend.me(&credentials.access).await {
            Ok(identity) => self.reconcile_confirmed(started, &credentials, identity).await,
            Err(err) => {
                warn!(error = %err, "stored credentials could not be confirmed; clearing");
                self.reconcile_failed(started).await;
            }
        }

        self.snapshot()
    }

    async fn reconcile_confirmed(&self, started: u64, credentials: &Credentials, identity: Identity) {
        let epochs = self.epochs.lock().await;
        if epochs.generation != started {
            debug!("startup reconciliation superseded; discarding confirmed identity");
            return;
        }

        if let Err(err) = self.store.put(&credentials.with_hints(&identity)).await {
            warn!(error = %err, "failed to refresh cached display hints");
        }
        info!(account = %identity.id, role = %identity.role, "session restored");
        self.publish(SessionState::Authenticated(identity));
    }

    async fn reconcile_failed(&self, started: u64) {
        let epochs = self.epochs.lock().await;
        if epochs.generation != started {
            debug!("startup reconciliation superseded; discarding failure");
            return;
        }

        self.clear_store().await;
        self.publish(SessionState::Unauthenticated);
    }

    /// Sign in and establish the authoritative identity.
    ///
    /// A rejected login leaves all state untouched and returns the backend's
    /// error as-is.
    pub async fn login(&self, username: &str, password: &str) -> Result<Identity, SessionError> {
        let started_logouts = self.epochs.lock().await.logouts;

        let tokens = self.backend.login(username, password).await.inspect_err(|err| {
            info!(username, error = %err, "login rejected");
        })?;

        let identity = match self.backend.me(&tokens.access).await {
            Ok(identity) => identity,
            Err(err) => {
                let mut epochs = self.epochs.lock().await;
                if epochs.logouts != started_logouts {
                    return Err(SessionError::Superseded);
                }
                warn!(username, error = %err, "login succeeded but identity fetch failed");
                epochs.generation += 1;
                self.clear_store().await;
                self.publish(SessionState::Unauthenticated);
                return Err(SessionError::IdentityUnavailable(Box::new(err)));
            }
        };

        let credentials = Credentials::issued(tokens, &identity);

        let mut epochs = self.epochs.lock().await;
        if epochs.logouts != started_logouts {
            info!(username, "login completed after a logout; discarding");
            return Err(SessionError::Superseded);
        }

        self.store.put(&credentials).await?;
        epochs.generation += 1;
        info!(account = %identity.id, role = %identity.role, "signed in");
        self.publish(SessionState::Authenticated(identity.clone()));

        Ok(identity)
    }

    /// Create an account. Does not sign in.
    pub async fn register(&self, registration: &Registration) -> Result<RegisteredAccount, SessionError> {
        registration.validate()?;
        let account = self.backend.register(registration).await?;
        info!(account = %account.id, role = %account.role, "account registered");
        Ok(account)
    }

    /// Sign out locally, telling the server on a best-effort basis.
    ///
    /// Always ends `Unauthenticated` with the credential record cleared,
    /// whether or not the server could be reached.
    pub async fn logout(&self) {
        let stored = self.store.read().await.unwrap_or_else(|err| {
            warn!(error = %err, "credential store unreadable during logout");
            None
        });

        match stored {
            Some(credentials) => {
                if let Err(err) = self.backend.logout(&credentials.access, &credentials.refresh).await {
                    warn!(error = %err, "server-side logout failed; clearing local session anyway");
                }
            }
            None => debug!("no refresh credential stored; skipping server logout"),
        }

        let mut epochs = self.epochs.lock().await;
        epochs.generation += 1;
        epochs.logouts += 1;
        self.clear_store().await;
        self.publish(SessionState::Unauthenticated);
        info!("signed out");
    }

    async fn clear_store(&self) {
        if let Err(err) = self.store.clear().await {
            warn!(error = %err, "failed to clear credential record");
        }
    }

    fn publish(&self, state: SessionState) {
        self.state.send_replace(SessionSnapshot::settled(state));
    }
}
