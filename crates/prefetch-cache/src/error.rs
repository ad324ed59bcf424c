use std::path::PathBuf;

/// Errors raised while installing a downloaded, verified file into the
/// content-addressable store.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("store root '{0}' does not exist")]
    StoreRootMissing(PathBuf),

    #[error("failed to create directory '{path}': {source}")]
    CreateDir { path: PathBuf, source: std::io::Error },

    #[error("failed to create alias sentinel '{path}': {source}")]
    CreateAlias { path: PathBuf, source: std::io::Error },

    #[error("failed to move '{from}' into the store at '{to}': {source}")]
    Install { from: PathBuf, to: PathBuf, source: std::io::Error },

    #[error("failed to compute size of '{path}': {source}")]
    Walk { path: PathBuf, source: std::io::Error },

    #[error("failed to remove '{path}' during cleanup: {source}")]
    Remove { path: PathBuf, source: std::io::Error },
}
