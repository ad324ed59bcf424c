//! Scrapes `(url, expected_hash)` pairs out of files in a source checkout.
//!
//! A [`Package`] pairs a name with two [`MatcherSpec`]s — one that locates a
//! URL, one that locates the hash that URL is expected to produce. Running
//! [`analyze_packages`] over a package list turns each matched package into a
//! [`prefetch_core::PrefetchItem`], ready for the downloader stage.

pub mod error;
pub mod matcher;
pub mod package;

pub use error::MatchError;
pub use matcher::{build_matcher, AnchorMatcher, MatcherSpec, MatcherSpecConfig, RegexMatcher};
pub use package::{analyze_packages, Package, PackageConfig};
