//! The content-addressable store: a Bazel `repository_cache`-compatible
//! directory layout, atomic installation of verified downloads, and a
//! [`janitor::Janitor`] that keeps the store within its configured size and
//! age bounds.

pub mod error;
pub mod janitor;
pub mod store;

pub use error::CacheError;
pub use janitor::{Janitor, JanitorLimits, JanitorReport};
pub use store::{CacheEntry, CasStore};
