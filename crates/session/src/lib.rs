//! `medgate-session`
//!
//! Client-side session core for the hospital admin API:
//! - [`CredentialStore`]: the persisted credential record (SQLite or memory)
//! - [`AuthBackend`]: the register/login/logout/me endpoints
//! - [`SessionManager`]: the authoritative identity and its lifecycle
//! - [`RouteGuard`]: route decisions bound to a live session
//!
//! Claims decoding and the access policy itself live in `medgate-auth`.

pub mod backend;
pub mod config;
pub mod error;
pub mod guard;
pub mod manager;
pub mod store;
pub mod types;

#[cfg(test)]
mod testing;

pub use backend::{AuthBackend, HttpAuthBackend};
pub use config::SessionConfig;
pub use error::{SessionError, StoreError};
pub use guard::RouteGuard;
pub use manager::{SessionManager, SessionSnapshot};
pub use store::{CredentialStore, MemoryCredentialStore, SqliteCredentialStore};
pub use types::{Credentials, FieldErrors, RegisteredAccount, Registration, TokenPair};
