//! `medgate-core`: shared primitives for the MedGate client.
//!
//! This crate holds the identifiers and error model that every other crate
//! agrees on. No IO, no transport.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::AccountId;
