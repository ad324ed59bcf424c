use std::path::{Path, PathBuf};
use std::time::SystemTime;

use humansize::{format_size, DECIMAL};

use crate::error::CacheError;

/// Size and age bounds a [`Janitor`] sweep enforces over a directory's
/// top-level entries.
#[derive(Debug, Clone, Copy)]
pub struct JanitorLimits {
    /// Hard ceiling: entries are removed oldest-first until the directory is
    /// at or under this size, regardless of age.
    pub max_size: u64,
    /// Below this size, nothing is removed at all.
    pub tolerant_size: u64,
    /// Between `tolerant_size` and `max_size`, only entries older than this
    /// (by modification time) are removed.
    pub max_age: std::time::Duration,
}

#[derive(Debug)]
struct Entry {
    path: PathBuf,
    size: u64,
    modified: SystemTime,
}

/// Sweeps the top-level entries of a directory (here, the per-hash buckets
/// under a store's `content_addressable/sha256/` directory), removing the
/// oldest ones first once the directory exceeds its size bounds.
///
/// Entry size is the true recursive size of each entry (a directory's
/// contents are walked fully); the reference implementation's directory
/// walk undercounted nested directories; this version doesn't repeat that.
pub struct Janitor {
    limits: JanitorLimits,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct JanitorReport {
    pub scanned_size: u64,
    pub removed: Vec<PathBuf>,
    pub freed: u64,
}

impl Janitor {
    pub fn new(limits: JanitorLimits) -> Self {
        Self { limits }
    }

    pub fn sweep(&self, dir: &Path) -> Result<JanitorReport, CacheError> {
        if !dir.is_dir() {
            return Err(CacheError::StoreRootMissing(dir.to_path_buf()));
        }

        let mut entries = list_entries(dir)?;
        let total_size: u64 = entries.iter().map(|e| e.size).sum();
        entries.sort_by_key(|e| e.modified);

        tracing::info!(dir = %dir.display(), size = %format_size(total_size, DECIMAL), items = entries.len(), "janitor scan complete");

        if total_size <= self.limits.tolerant_size {
            tracing::debug!("within tolerant size, nothing to do");
            return Ok(JanitorReport { scanned_size: total_size, removed: Vec::new(), freed: 0 });
        }

        let mut current_size = total_size;
        let mut report = JanitorReport { scanned_size: total_size, removed: Vec::new(), freed: 0 };
        let now = SystemTime::now();

        for entry in entries {
            if current_size <= self.limits.tolerant_size {
                break;
            }

            let should_remove = if current_size > self.limits.max_size {
                true
            } else {
                now.duration_since(entry.modified).map(|age| age > self.limits.max_age).unwrap_or(false)
            };

            if !should_remove {
                continue;
            }

            remove_entry(&entry.path)?;
            current_size -= entry.size;
            report.freed += entry.size;
            report.removed.push(entry.path.clone());
            tracing::info!(
                path = %entry.path.display(),
                freed = %format_size(entry.size, DECIMAL),
                current_size = %format_size(current_size, DECIMAL),
                "removed cache entry"
            );
        }

        Ok(report)
    }
}

fn list_entries(dir: &Path) -> Result<Vec<Entry>, CacheError> {
    let read_dir = fs_err::read_dir(dir).map_err(|e| CacheError::Walk { path: dir.to_path_buf(), source: e.into() })?;

    let mut entries = Vec::new();
    for item in read_dir {
        let item = item.map_err(|e| CacheError::Walk { path: dir.to_path_buf(), source: e })?;
        let path = item.path();
        let (size, modified) = recursive_size_and_mtime(&path)?;
        entries.push(Entry { path, size, modified });
    }
    Ok(entries)
}

fn recursive_size_and_mtime(path: &Path) -> Result<(u64, SystemTime), CacheError> {
    let mut total_size = 0u64;
    let mut latest = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| CacheError::Walk { path: path.to_path_buf(), source: e })?;

    for walk_entry in walkdir::WalkDir::new(path) {
        let walk_entry = walk_entry.map_err(|e| CacheError::Walk {
            path: path.to_path_buf(),
            source: e.into_io_error().unwrap_or_else(|| std::io::Error::other("walkdir error")),
        })?;
        let metadata = walk_entry
            .metadata()
            .map_err(|e| CacheError::Walk { path: walk_entry.path().to_path_buf(), source: e.into() })?;

        if metadata.is_file() {
            total_size += metadata.len();
        }
        if let Ok(modified) = metadata.modified() {
            if modified > latest {
                latest = modified;
            }
        }
    }

    Ok((total_size, latest))
}

fn remove_entry(path: &Path) -> Result<(), CacheError> {
    let metadata = fs_err::metadata(path).map_err(|e| CacheError::Remove { path: path.to_path_buf(), source: e.into() })?;
    let result = if metadata.is_dir() { std::fs::remove_dir_all(path) } else { std::fs::remove_file(path) };
    result.map_err(|e| CacheError::Remove { path: path.to_path_buf(), source: e })
}
