use serde::Deserialize;

use prefetch_downloaders::DownloaderSpec;
use prefetch_matchers::PackageConfig;

/// The raw shape of `server.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub server: ServerSection,
    #[serde(default)]
    pub downloaders: Vec<DownloaderSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    /// Bound, in seconds, on each subprocess invocation the pipeline makes
    /// (the git refresh steps, the downloader) — not an HTTP timeout.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    pub downloader: String,
    /// The pipeline's working directory; may contain a literal `$home`
    /// token, expanded against the running user's home directory at load
    /// time (see `loader::expand_home`).
    pub workdir: String,
    pub scheduler: SchedulerSection,
    #[serde(default)]
    pub cleanup: CleanupSection,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSection {
    /// Minimum number of seconds between two runs.
    pub interval: u64,
    /// `HH:MM`, start of the excluded window during which the scheduler
    /// will not run regardless of `interval`.
    pub start_time: String,
    /// `HH:MM`, end of the excluded window.
    pub end_time: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CleanupSection {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub max_size: u64,
    #[serde(default)]
    pub tolerant_size: u64,
    /// Max age **in days**, as written in the JSON file. Converted to a
    /// `Duration` of seconds (`× 86400`) by `loader::cleanup_max_age`.
    #[serde(default)]
    pub max_age: u64,
}

/// The raw shape of `prefetches.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct PrefetchConfig {
    pub items: Vec<PackageConfig>,
}
