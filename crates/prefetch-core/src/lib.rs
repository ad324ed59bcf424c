//! Shared data model for the prefetch warming pipeline: the [`item::PrefetchItem`]
//! unit of work and the sha256 helpers every stage needs to compute or verify
//! content/URL hashes.

pub mod hashing;
pub mod item;

pub use hashing::{sha256_hex_bytes, sha256_hex_file, sha256_hex_str};
pub use item::{ItemError, ItemErrorKind, PrefetchItem};
