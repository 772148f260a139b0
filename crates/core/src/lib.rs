//! Domain types and pure logic for the warden authentication backend.
//!
//! Nothing in this crate performs I/O. Persistence lives in `warden-db` and
//! the HTTP boundary in `warden-api`.

pub mod auth;
pub mod error;
pub mod identity;
pub mod session;
pub mod types;
pub mod validation;
