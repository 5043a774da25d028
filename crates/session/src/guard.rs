//! Route guard bound to a live session.

use std::sync::Arc;

use medgate_auth::{GuardDecision, NavLink, Navigation, RoleSet, RouteTable, SessionState, decide, navigation_for};
use tokio::sync::watch;

use crate::manager::{SessionManager, SessionSnapshot};

/// Answers "may this path render right now?" against the session's
/// authoritative state. Provisional claims never reach a decision here.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    session: watch::Receiver<SessionSnapshot>,
    routes: Arc<RouteTable>,
}

impl RouteGuard {
    pub fn new(manager: &SessionManager, routes: RouteTable) -> Self {
        Self {
            session: manager.subscribe(),
            routes: Arc::new(routes),
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Decision for `path` given the state as of now. While the session is
    /// loading, protected paths resolve to [`Navigation::Placeholder`].
    pub fn current(&self, path: &str) -> Navigation {
        let snapshot = self.session.borrow();
        self.routes.resolve(path, &snapshot.state)
    }

    /// Wait until the session leaves `Loading`, then resolve `path`.
    ///
    /// If the session manager is gone the guard treats the user as signed out.
    pub async fn settle(&self, path: &str) -> Navigation {
        let mut rx = self.session.clone();
        match rx.wait_for(|s| !s.state.is_loading()).await {
            Ok(snapshot) => self.routes.resolve(path, &snapshot.state),
            Err(_) => {
                tracing::debug!(path, "session closed while loading; resolving as signed out");
                self.routes.resolve(path, &SessionState::Unauthenticated)
            }
        }
    }

    /// Raw decision for a protected region requiring `required`.
    pub fn decide(&self, required: Option<RoleSet>) -> GuardDecision {
        let snapshot = self.session.borrow();
        decide(&snapshot.state, required, self.routes.landing())
    }

    /// Sidebar links for the confirmed role; empty until authenticated.
    pub fn navigation(&self) -> &'static [NavLink] {
        match self.session.borrow().state.identity() {
            Some(identity) => navigation_for(identity.role),
            None => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCredentialStore;
    use crate::testing::{FakeBackend, identity, token_for};
    use crate::types::Credentials;
    use medgate_auth::{DASHBOARD_PATH, DOCTOR_APPOINTMENTS_PATH, LOGIN_PATH, Role};

    fn session_with(backend: Arc<FakeBackend>, store: MemoryCredentialStore) -> Arc<SessionManager> {
        Arc::new(SessionManager::new(Arc::new(store), backend))
    }

    #[tokio::test]
    async fn loading_session_shows_placeholder_not_redirect() {
        let m = session_with(Arc::new(FakeBackend::new()), MemoryCredentialStore::new());
        let guard = RouteGuard::new(&m, RouteTable::hospital());

        assert_eq!(guard.current("/patients"), Navigation::Placeholder);
        assert_eq!(guard.current(LOGIN_PATH), Navigation::Render);
        assert_eq!(guard.decide(None), GuardDecision::Pending);
        assert!(guard.navigation().is_empty());
    }

    #[tokio::test]
    async fn settle_waits_for_reconciliation() {
        let access = token_for(Some("admin"), Some("drsmith"));
        let backend = Arc::new(FakeBackend::new());
        backend.add_identity(&access, identity(7, "drsmith", None, Role::Doctor));
        let gate = backend.hold_me();
        let store = MemoryCredentialStore::with_record(Credentials {
            access,
            refresh: "r".to_string(),
            role_hint: Some(Role::Admin),
            display_name: None,
        });
        let m = session_with(backend, store);
        let guard = RouteGuard::new(&m, RouteTable::hospital());

        let init = tokio::spawn({
            let m = m.clone();
            async move { m.init().await }
        });
        let settled = tokio::spawn({
            let guard = guard.clone();
            async move { guard.settle("/doctors").await }
        });

        tokio::task::yield_now().await;
        // Token says admin; still not enough to render an admin-only page.
        assert_eq!(guard.current("/doctors"), Navigation::Placeholder);

        gate.add_permits(1);
        init.await.unwrap();
        assert_eq!(settled.await.unwrap(), Navigation::RedirectTo(DOCTOR_APPOINTMENTS_PATH));
        assert_eq!(guard.current("/doctor/appointments"), Navigation::Render);
    }

    #[tokio::test]
    async fn signed_out_user_is_sent_to_login() {
        let m = session_with(Arc::new(FakeBackend::new()), MemoryCredentialStore::new());
        let guard = RouteGuard::new(&m, RouteTable::hospital());
        m.init().await;

        assert_eq!(guard.settle("/patients").await, Navigation::RedirectToLogin);
        assert_eq!(guard.current("/"), Navigation::RedirectToLogin);
        assert_eq!(guard.current("/no-such-page"), Navigation::NotFound);
    }

    #[tokio::test]
    async fn navigation_follows_confirmed_role() {
        let backend = Arc::new(FakeBackend::new());
        backend.add_account("amy", "pw", identity(3, "amy", None, Role::Receptionist));
        let m = session_with(backend, MemoryCredentialStore::new());
        let guard = RouteGuard::new(&m, RouteTable::hospital());
        m.init().await;
        m.login("amy", "pw").await.unwrap();

        assert_eq!(guard.navigation(), navigation_for(Role::Receptionist));
        assert_eq!(guard.current("/doctors"), Navigation::RedirectTo(DASHBOARD_PATH));
        assert_eq!(guard.decide(Some(RoleSet::of(&[Role::Receptionist]))), GuardDecision::Allow);

        m.logout().await;
        assert!(guard.navigation().is_empty());
        assert_eq!(guard.current("/patients"), Navigation::RedirectToLogin);
    }

    #[tokio::test]
    async fn settle_after_manager_dropped_resolves_signed_out() {
        let m = SessionManager::new(Arc::new(MemoryCredentialStore::new()), Arc::new(FakeBackend::new()));
        let guard = RouteGuard::new(&m, RouteTable::hospital());
        drop(m);

        assert_eq!(guard.settle("/patients").await, Navigation::RedirectToLogin);
    }
}
