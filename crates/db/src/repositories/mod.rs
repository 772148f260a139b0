//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that accept
//! any Postgres executor as the first argument: `&PgPool` for standalone
//! statements, or `&mut *tx` to take part in a caller's transaction.

pub mod session_repo;
pub mod user_provider_repo;
pub mod user_repo;

pub use session_repo::SessionRepo;
pub use user_provider_repo::UserProviderRepo;
pub use user_repo::UserRepo;
