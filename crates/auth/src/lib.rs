//! `medgate-auth`: pure session and authorization model.
//!
//! No HTTP and no storage here. The session crate drives these types and
//! feeds them the server's answers.

pub mod claims;
pub mod identity;
pub mod policy;
pub mod roles;
pub mod routes;

pub use claims::{ProvisionalClaims, decode};
pub use identity::{Identity, SessionState};
pub use policy::{
    DASHBOARD_PATH, DOCTOR_APPOINTMENTS_PATH, GuardDecision, LOGIN_PATH, LandingRoutes, decide,
};
pub use roles::{Role, RoleParseError, RoleSet};
pub use routes::{NavLink, Navigation, RouteAccess, RouteSpec, RouteTable, navigation_for};
