#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("no downloader registered under the name '{0}'")]
    UnknownDownloader(String),

    #[error("invalid argument-rule pattern '{pattern}': {source}")]
    InvalidRulePattern { pattern: String, source: regex::Error },

    #[error("failed to start '{cmd}': {source}")]
    Spawn { cmd: String, source: std::io::Error },

    #[error("'{cmd}' exited with {status}")]
    NonZeroExit { cmd: String, status: String },
}
