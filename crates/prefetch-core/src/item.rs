use std::path::PathBuf;

use url::Url;

use crate::hashing::sha256_hex_str;

/// The kind of terminal failure recorded against a [`PrefetchItem`].
///
/// Each pipeline stage owns its own detailed error type (see the
/// `prefetch-downloaders` and `prefetch-cache` crates); by the time a
/// failure is attached to an item it has already been reduced to one of
/// these coarse kinds plus a human-readable message, so that `prefetch-core`
/// doesn't need to depend on every other crate in the workspace just to name
/// its own data model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemErrorKind {
    /// The downloader failed to fetch the URL at all.
    Download,
    /// The downloaded bytes did not hash to `expected_hash`.
    Integrity,
    /// The verified bytes could not be placed into the content-addressed store.
    Install,
}

/// A terminal, per-item failure. Recording one of these means the item was
/// never installed and the pipeline moves on to the next item.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct ItemError {
    pub kind: ItemErrorKind,
    pub message: String,
}

impl ItemError {
    pub fn download(message: impl Into<String>) -> Self {
        Self { kind: ItemErrorKind::Download, message: message.into() }
    }

    pub fn integrity(expected: &str, actual: &str) -> Self {
        Self {
            kind: ItemErrorKind::Integrity,
            message: format!("expected sha256 {expected} but downloaded bytes hash to {actual}"),
        }
    }

    pub fn install(message: impl Into<String>) -> Self {
        Self { kind: ItemErrorKind::Install, message: message.into() }
    }
}

/// One unit of prefetch work: a URL discovered in the source tree, paired
/// with the sha256 hash it is expected to have (if known up front).
///
/// Constructed fresh by the matcher engine every tick; never carried over
/// between ticks (see the orchestrator's per-tick item list).
#[derive(Debug, Clone)]
pub struct PrefetchItem {
    pub url: Url,
    /// Lowercase hex sha256, known ahead of download. `None` means the hash
    /// is unknown up front and the computed hash becomes authoritative once
    /// the bytes are downloaded (see `adopt_computed_hash`).
    pub expected_hash: Option<String>,
    /// sha256 of `url` itself, used as the alias sentinel file name. Always
    /// derivable up front, independent of whether the content hash is known.
    pub url_hash: String,
    /// Where the verified bytes ended up in the content-addressed store.
    /// Set only once installation succeeds.
    pub local_path: Option<PathBuf>,
    /// Size in bytes of the downloaded content. Set after verification.
    pub size: Option<u64>,
    /// Terminal failure reason, if this item did not make it into the store.
    pub error: Option<ItemError>,
}

impl PrefetchItem {
    pub fn new(url: Url, expected_hash: Option<String>) -> Self {
        let url_hash = sha256_hex_str(url.as_str());
        Self { url, expected_hash, url_hash, local_path: None, size: None, error: None }
    }

    /// Name of the URL-alias sentinel file for this item: `id-<sha256(url)>`.
    pub fn alias_filename(&self) -> String {
        format!("id-{}", self.url_hash)
    }

    /// True once this item has a hash it can be verified and stored against,
    /// either because it was known up front or because a download already
    /// adopted the computed hash as authoritative.
    pub fn has_hash(&self) -> bool {
        self.expected_hash.as_deref().is_some_and(|h| !h.is_empty())
    }

    /// Adopt `computed` as the authoritative hash. Only meaningful when
    /// `expected_hash` was empty; callers are responsible for verifying a
    /// non-empty `expected_hash` against `computed` themselves (see
    /// `prefetch-orchestrator`'s integrity check) rather than calling this.
    pub fn adopt_computed_hash(&mut self, computed: String) {
        self.expected_hash = Some(computed);
    }

    pub fn mark_failed(&mut self, error: ItemError) {
        self.error = Some(error);
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn url_hash_is_derived_eagerly() {
        let item = PrefetchItem::new(url("https://example.com/x.tgz"), None);
        assert_eq!(item.url_hash, sha256_hex_str("https://example.com/x.tgz"));
        assert_eq!(item.alias_filename(), format!("id-{}", item.url_hash));
    }

    #[test]
    fn empty_hash_means_not_yet_known() {
        let item = PrefetchItem::new(url("https://example.com/x.tgz"), Some(String::new()));
        assert!(!item.has_hash());
    }

    #[test]
    fn adopting_a_computed_hash_makes_it_authoritative() {
        let mut item = PrefetchItem::new(url("https://example.com/x.tgz"), None);
        assert!(!item.has_hash());
        item.adopt_computed_hash("abc123".to_string());
        assert!(item.has_hash());
        assert_eq!(item.expected_hash.as_deref(), Some("abc123"));
    }
}
