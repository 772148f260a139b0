//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` entity struct matching the database row
//! - Input DTOs for inserts and upserts
//! - Projection structs for aggregate queries where needed

pub mod session;
pub mod user;
pub mod user_provider;
