use std::path::PathBuf;

/// Errors raised while running a single [`crate::MatcherSpec`].
///
/// These are never fatal to the tick: the analyzer catches them, logs, and
/// skips the owning package (see [`crate::analyze_packages`]).
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error("failed to read file '{path}': {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },

    #[error("invalid regex '{pattern}': {source}")]
    InvalidRegex { pattern: String, source: regex::Error },
}
