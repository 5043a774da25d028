//! Per-route authorization decision.
//!
//! - No IO
//! - No panics
//! - Decides on the authoritative [`SessionState`] only; provisional claims
//!   never reach this module.

use serde::Serialize;

use crate::{Role, RoleSet, SessionState};

/// Sign-in entry point.
pub const LOGIN_PATH: &str = "/login";
/// General dashboard, landing route for admins and receptionists.
pub const DASHBOARD_PATH: &str = "/dashboard";
/// Doctor's own appointments, landing route for doctors.
pub const DOCTOR_APPOINTMENTS_PATH: &str = "/doctor/appointments";

/// Outcome of guarding one protected view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GuardDecision {
    /// Session still loading: show a neutral placeholder, do not redirect.
    Pending,
    /// Nobody is signed in: go to the sign-in entry point.
    DenyUnauthenticated,
    /// Signed in, but the role is not admitted here: go to the role's landing route.
    DenyWrongRole { landing: &'static str },
    Allow,
}

impl GuardDecision {
    /// Where the caller must navigate, if anywhere.
    pub fn redirect_target(&self) -> Option<&'static str> {
        match self {
            GuardDecision::DenyUnauthenticated => Some(LOGIN_PATH),
            GuardDecision::DenyWrongRole { landing } => Some(*landing),
            GuardDecision::Pending | GuardDecision::Allow => None,
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardDecision::Allow)
    }
}

/// Default landing route per role.
///
/// Used both for the root redirect and for wrong-role denials, so a user who
/// strays outside their role always lands on the same screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LandingRoutes {
    pub doctor: &'static str,
    pub fallback: &'static str,
}

impl Default for LandingRoutes {
    fn default() -> Self {
        Self {
            doctor: DOCTOR_APPOINTMENTS_PATH,
            fallback: DASHBOARD_PATH,
        }
    }
}

impl LandingRoutes {
    pub fn for_role(&self, role: Role) -> &'static str {
        match role {
            Role::Doctor => self.doctor,
            Role::Admin | Role::Receptionist => self.fallback,
        }
    }
}

/// Decide whether the current session may see a view admitting `required`.
///
/// `required: None` admits any authenticated user.
pub fn decide(
    state: &SessionState,
    required: Option<RoleSet>,
    landing: &LandingRoutes,
) -> GuardDecision {
    match state {
        SessionState::Loading => GuardDecision::Pending,
        SessionState::Unauthenticated => GuardDecision::DenyUnauthenticated,
        SessionState::Authenticated(identity) => match required {
            Some(roles) if !roles.contains(identity.role) => GuardDecision::DenyWrongRole {
                landing: landing.for_role(identity.role),
            },
            _ => GuardDecision::Allow,
        },
    }
}
