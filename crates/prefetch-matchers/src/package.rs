use std::path::Path;

use prefetch_core::PrefetchItem;
use url::Url;

use crate::matcher::{build_matcher, MatcherSpec, MatcherSpecConfig};

/// One package entry from `prefetches.json`: a name plus the two matchers
/// that locate its URL and (optionally known ahead of time) hash.
#[derive(Debug, Clone)]
pub struct Package {
    pub name: String,
    pub url_matcher: MatcherSpec,
    pub hash_matcher: MatcherSpec,
}

/// The raw config shape for one entry of `prefetches.json`'s `items` array.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct PackageConfig {
    pub name: String,
    pub url_matcher: MatcherSpecConfig,
    #[serde(default)]
    pub hash_matcher: MatcherSpecConfig,
}

impl Package {
    pub fn from_config(src_dir: &Path, config: &PackageConfig) -> Result<Self, String> {
        Ok(Self {
            name: config.name.clone(),
            url_matcher: build_matcher(src_dir, &config.url_matcher)?,
            hash_matcher: build_matcher(src_dir, &config.hash_matcher)?,
        })
    }

    /// Runs both matchers and produces a [`PrefetchItem`] only if both the
    /// URL and the hash matcher found something — same as the reference
    /// analyzer's `getDownloadUrlAndHash`, which returns `os.ErrNotExist` and
    /// skips the package the moment either matcher comes back unmatched. A
    /// package whose hash matcher drifts and stops finding a hash is skipped
    /// entirely rather than downgraded to an "unknown hash" item: that would
    /// silently disable integrity verification for it.
    pub fn analyze(&self) -> Option<PrefetchItem> {
        let url_str = match self.url_matcher.find() {
            Ok(Some(s)) => s,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(package = %self.name, error = %err, "url matcher failed");
                return None;
            }
        };

        let url = match Url::parse(&url_str) {
            Ok(u) => u,
            Err(err) => {
                tracing::warn!(package = %self.name, url = %url_str, error = %err, "matched url did not parse");
                return None;
            }
        };

        let hash = match self.hash_matcher.find() {
            Ok(Some(h)) => h,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(package = %self.name, error = %err, "hash matcher failed");
                return None;
            }
        };

        Some(PrefetchItem::new(url, Some(hash)))
    }
}

/// Analyzes every package, collecting only the ones that yielded an item.
/// Never returns an `Err`: per-package matcher failures are logged and
/// skipped rather than failing the whole tick.
pub fn analyze_packages(packages: &[Package]) -> Vec<PrefetchItem> {
    packages.iter().filter_map(Package::analyze).collect()
}
