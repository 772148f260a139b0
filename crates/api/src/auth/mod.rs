//! Session authentication: cookie policy, the session lifecycle, and identity
//! provider adapters.

pub mod cookie;
pub mod lifecycle;
pub mod provider;
