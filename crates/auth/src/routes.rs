//! Application route map and per-role navigation.

use serde::Serialize;

use crate::policy::{DASHBOARD_PATH, DOCTOR_APPOINTMENTS_PATH, GuardDecision, LOGIN_PATH, LandingRoutes, decide};
use crate::{Role, RoleSet, SessionState};

const FRONT_DESK: RoleSet = RoleSet::of(&[Role::Admin, Role::Receptionist]);
const ADMIN_ONLY: RoleSet = RoleSet::of(&[Role::Admin]);
const DOCTOR_ONLY: RoleSet = RoleSet::of(&[Role::Doctor]);
const ALL_STAFF: RoleSet = RoleSet::of(&Role::ALL);

/// How a route is gated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    /// Reachable without a session (sign-in, registration).
    Public,
    /// Requires a session; `None` admits any role.
    Protected(Option<RoleSet>),
    /// Requires a session, then forwards to the role's landing route.
    HomeRedirect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteSpec {
    pub path: &'static str,
    pub access: RouteAccess,
}

/// What the router should do for a path, given the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "navigation", content = "target", rename_all = "snake_case")]
pub enum Navigation {
    /// Session still loading; render the neutral loader only.
    Placeholder,
    Render,
    RedirectToLogin,
    RedirectTo(&'static str),
    NotFound,
}

impl Navigation {
    pub fn target(&self) -> Option<&'static str> {
        match self {
            Navigation::RedirectToLogin => Some(LOGIN_PATH),
            Navigation::RedirectTo(path) => Some(*path),
            Navigation::Placeholder | Navigation::Render | Navigation::NotFound => None,
        }
    }
}

impl From<GuardDecision> for Navigation {
    fn from(decision: GuardDecision) -> Self {
        match decision {
            GuardDecision::Pending => Navigation::Placeholder,
            GuardDecision::DenyUnauthenticated => Navigation::RedirectToLogin,
            GuardDecision::DenyWrongRole { landing } => Navigation::RedirectTo(landing),
            GuardDecision::Allow => Navigation::Render,
        }
    }
}

/// Route map consulted on every navigation.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<RouteSpec>,
    landing: LandingRoutes,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::hospital()
    }
}

impl RouteTable {
    /// The hospital front end's routes.
    pub fn hospital() -> Self {
        use RouteAccess::*;

        let routes = vec![
            RouteSpec { path: LOGIN_PATH, access: Public },
            RouteSpec { path: "/register", access: Public },
            RouteSpec { path: "/", access: HomeRedirect },
            RouteSpec { path: DASHBOARD_PATH, access: Protected(Some(FRONT_DESK)) },
            RouteSpec { path: "/patients", access: Protected(Some(FRONT_DESK)) },
            RouteSpec { path: "/doctors", access: Protected(Some(ADMIN_ONLY)) },
            RouteSpec { path: "/appointments", access: Protected(Some(FRONT_DESK)) },
            RouteSpec { path: DOCTOR_APPOINTMENTS_PATH, access: Protected(Some(DOCTOR_ONLY)) },
            RouteSpec { path: "/lab", access: Protected(Some(ALL_STAFF)) },
            RouteSpec { path: "/beds", access: Protected(Some(FRONT_DESK)) },
        ];

        Self {
            routes,
            landing: LandingRoutes::default(),
        }
    }

    pub fn with_landing(mut self, landing: LandingRoutes) -> Self {
        self.landing = landing;
        self
    }

    pub fn landing(&self) -> &LandingRoutes {
        &self.landing
    }

    pub fn routes(&self) -> &[RouteSpec] {
        &self.routes
    }

    pub fn lookup(&self, path: &str) -> Option<&RouteSpec> {
        let path = normalize(path);
        self.routes.iter().find(|r| r.path == path)
    }

    /// Resolve a navigation to `path` against the current session.
    pub fn resolve(&self, path: &str, state: &SessionState) -> Navigation {
        let Some(route) = self.lookup(path) else {
            return Navigation::NotFound;
        };

        match route.access {
            RouteAccess::Public => Navigation::Render,
            RouteAccess::Protected(required) => decide(state, required, &self.landing).into(),
            RouteAccess::HomeRedirect => match decide(state, None, &self.landing) {
                GuardDecision::Allow => match state.identity() {
                    Some(identity) => Navigation::RedirectTo(self.landing.for_role(identity.role)),
                    None => Navigation::RedirectToLogin,
                },
                other => other.into(),
            },
        }
    }
}

fn normalize(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

/// One sidebar entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavLink {
    pub to: &'static str,
    pub label: &'static str,
}

const ADMIN_LINKS: &[NavLink] = &[
    NavLink { to: DASHBOARD_PATH, label: "Dashboard" },
    NavLink { to: "/patients", label: "Patient Registration" },
    NavLink { to: "/doctors", label: "Doctor Management" },
    NavLink { to: "/appointments", label: "Appointments" },
    NavLink { to: "/lab", label: "Lab" },
    NavLink { to: "/beds", label: "Bed Management" },
];

const RECEPTIONIST_LINKS: &[NavLink] = &[
    NavLink { to: DASHBOARD_PATH, label: "Dashboard" },
    NavLink { to: "/patients", label: "Patient Registration" },
    NavLink { to: "/appointments", label: "Appointments" },
    NavLink { to: "/lab", label: "Lab" },
    NavLink { to: "/beds", label: "Bed Management" },
];

const DOCTOR_LINKS: &[NavLink] = &[
    NavLink { to: DOCTOR_APPOINTMENTS_PATH, label: "Appointments" },
    NavLink { to: "/lab", label: "Lab" },
];

/// Sidebar links shown to `role`, in display order.
pub fn navigation_for(role: Role) -> &'static [NavLink] {
    match role {
        Role::Admin => ADMIN_LINKS,
        Role::Receptionist => RECEPTIONIST_LINKS,
        Role::Doctor => DOCTOR_LINKS,
    }
}
