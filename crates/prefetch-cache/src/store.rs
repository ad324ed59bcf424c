use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::CacheError;

/// Layout is compatible with Bazel's `repository_cache`:
/// `<root>/content_addressable/sha256/<hex>/{file, id-<urlhash>}`.
const CONTENT_ADDRESSABLE_DIR: &str = "content_addressable";
const HASH_ALGO_DIR: &str = "sha256";
const CONTENT_FILE_NAME: &str = "file";

/// Where one hash's bucket lives in the store, and the paths within it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub hash: String,
    pub bucket_dir: PathBuf,
    pub file_path: PathBuf,
}

impl CacheEntry {
    fn new(root: &Path, hash: &str) -> Self {
        let bucket_dir = root.join(CONTENT_ADDRESSABLE_DIR).join(HASH_ALGO_DIR).join(hash);
        let file_path = bucket_dir.join(CONTENT_FILE_NAME);
        Self { hash: hash.to_string(), bucket_dir, file_path }
    }

    pub fn alias_path(&self, alias_filename: &str) -> PathBuf {
        self.bucket_dir.join(alias_filename)
    }
}

/// A content-addressable store rooted at `root`, one bucket per sha256.
#[derive(Debug, Clone)]
pub struct CasStore {
    root: PathBuf,
}

impl CasStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where content hashing to `hash` would live, whether or not it's there yet.
    pub fn entry_for(&self, hash: &str) -> CacheEntry {
        CacheEntry::new(&self.root, hash)
    }

    /// `Some(entry)` if the content for `hash` is already installed under
    /// the given `url_hash` — present iff both `file` and the `id-<url_hash>`
    /// alias sentinel exist as regular files, matching the reference
    /// `checkIfExistsInBazelCache`'s check of both `innerFile` and
    /// `hashFile`. Checking the alias too means deleting just the alias
    /// (without touching `file`) is enough to make the entry absent again.
    pub fn probe(&self, hash: &str, url_hash: &str) -> Option<CacheEntry> {
        let entry = self.entry_for(hash);
        let alias_path = entry.alias_path(&format!("id-{url_hash}"));
        (entry.file_path.is_file() && alias_path.is_file()).then_some(entry)
    }

    /// When an item's content hash isn't known up front, the only way to
    /// tell whether it was already fetched is to look for its `id-<url_hash>`
    /// alias sentinel across every bucket. Walks `content_addressable/sha256`
    /// looking for a bucket containing both the alias file and `file`.
    ///
    /// This is an `O(buckets)` directory listing, same cost as the
    /// reference's `filepath.WalkDir` over the whole cache dir — acceptable
    /// here because it only runs for items whose hash wasn't known ahead of
    /// time, which is the uncommon case.
    pub fn probe_by_url_hash(&self, url_hash: &str) -> Result<Option<CacheEntry>, CacheError> {
        let cas_dir = self.root.join(CONTENT_ADDRESSABLE_DIR).join(HASH_ALGO_DIR);
        if !cas_dir.is_dir() {
            return Ok(None);
        }

        let alias_name = format!("id-{url_hash}");
        let read_dir = fs_err::read_dir(&cas_dir).map_err(|e| CacheError::Walk { path: cas_dir.clone(), source: e.into() })?;

        for bucket in read_dir {
            let bucket = bucket.map_err(|e| CacheError::Walk { path: cas_dir.clone(), source: e })?;
            let bucket_dir = bucket.path();
            if bucket_dir.join(&alias_name).is_file() && bucket_dir.join(CONTENT_FILE_NAME).is_file() {
                let hash = bucket_dir.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string();
                return Ok(Some(CacheEntry { hash, file_path: bucket_dir.join(CONTENT_FILE_NAME), bucket_dir }));
            }
        }
        Ok(None)
    }

    /// Moves `staged_file` (already verified to hash to `hash`) into the
    /// store and drops an empty `id-<url_hash>` alias sentinel alongside it.
    ///
    /// Uses `rename(2)` for the final move; if `staged_file` lives on a
    /// different filesystem than the store (`EXDEV`), falls back to copying
    /// `staged_file` into a same-directory staging file first, so the final
    /// rename is always same-filesystem and therefore atomic.
    pub fn install(&self, hash: &str, staged_file: &Path, url_hash: &str) -> Result<CacheEntry, CacheError> {
        if !self.root.is_dir() {
            return Err(CacheError::StoreRootMissing(self.root.clone()));
        }

        let entry = self.entry_for(hash);
        fs_err::create_dir_all(&entry.bucket_dir)
            .map_err(|e| CacheError::CreateDir { path: entry.bucket_dir.clone(), source: e.into() })?;

        let alias_path = entry.alias_path(&format!("id-{url_hash}"));
        fs_err::File::create(&alias_path)
            .map_err(|e| CacheError::CreateAlias { path: alias_path.clone(), source: e.into() })?;

        atomic_move(staged_file, &entry.file_path)
            .map_err(|source| CacheError::Install { from: staged_file.to_path_buf(), to: entry.file_path.clone(), source })?;

        Ok(entry)
    }
}

fn atomic_move(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.raw_os_error() == Some(libc_exdev()) => {
            let staging = to.with_extension("staging");
            fs::copy(from, &staging)?;
            fs::rename(&staging, to)?;
            fs::remove_file(from)?;
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// `EXDEV`'s numeric value, hardcoded rather than pulled from the `libc`
/// crate: it's the same value (18) on every platform this store targets
/// (Linux, macOS), and pulling in `libc` for one constant isn't worth it.
fn libc_exdev() -> i32 {
    18
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    fn store() -> (tempfile::TempDir, CasStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = CasStore::new(dir.path());
        (dir, store)
    }

    fn write_temp(dir: &Path, content: &[u8]) -> PathBuf {
        let path = dir.join("staged");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content).unwrap();
        path
    }

    #[test]
    fn probe_finds_nothing_in_an_empty_store() {
        let (_dir, store) = store();
        assert!(store.probe("deadbeef", "urlhash123").is_none());
    }

    #[test]
    fn install_then_probe_round_trips() {
        let (dir, store) = store();
        let staged = write_temp(dir.path(), b"hello world");
        let entry = store.install("deadbeef", &staged, "urlhash123").unwrap();
        assert!(entry.file_path.is_file());
        assert_eq!(fs_err::read(&entry.file_path).unwrap(), b"hello world");

        let probed = store.probe("deadbeef", "urlhash123").unwrap();
        assert_eq!(probed.file_path, entry.file_path);
    }

    #[test]
    fn probe_is_absent_once_the_alias_is_removed_even_though_file_remains() {
        let (dir, store) = store();
        let staged = write_temp(dir.path(), b"hello world");
        let entry = store.install("deadbeef", &staged, "urlhash123").unwrap();
        assert!(entry.file_path.is_file());

        fs_err::remove_file(entry.alias_path("id-urlhash123")).unwrap();

        assert!(store.probe("deadbeef", "urlhash123").is_none());
    }

    #[test]
    fn probe_rejects_a_mismatched_url_hash_even_if_the_hash_bucket_exists() {
        let (dir, store) = store();
        let staged = write_temp(dir.path(), b"hello world");
        store.install("deadbeef", &staged, "urlhash123").unwrap();

        assert!(store.probe("deadbeef", "some-other-url-hash").is_none());
    }

    #[test]
    fn install_drops_an_empty_alias_sentinel() {
        let (dir, store) = store();
        let staged = write_temp(dir.path(), b"content");
        let entry = store.install("deadbeef", &staged, "urlhash123").unwrap();
        let alias = entry.alias_path("id-urlhash123");
        assert!(alias.is_file());
        assert_eq!(fs_err::metadata(&alias).unwrap().len(), 0);
    }

    #[test]
    fn probe_by_url_hash_finds_the_bucket_that_owns_the_alias() {
        let (dir, store) = store();
        let staged = write_temp(dir.path(), b"content");
        store.install("deadbeef", &staged, "urlhash123").unwrap();

        let found = store.probe_by_url_hash("urlhash123").unwrap().unwrap();
        assert_eq!(found.hash, "deadbeef");
    }

    #[test]
    fn probe_by_url_hash_finds_nothing_for_an_unknown_alias() {
        let (dir, store) = store();
        let staged = write_temp(dir.path(), b"content");
        store.install("deadbeef", &staged, "urlhash123").unwrap();

        assert!(store.probe_by_url_hash("some-other-url-hash").unwrap().is_none());
    }

    #[test]
    fn install_fails_loudly_when_store_root_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let missing_root = dir.path().join("does-not-exist");
        let store = CasStore::new(&missing_root);
        let staged = write_temp(dir.path(), b"x");
        assert!(matches!(store.install("deadbeef", &staged, "u"), Err(CacheError::StoreRootMissing(_))));
    }
}
