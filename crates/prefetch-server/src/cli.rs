use std::path::PathBuf;

use clap::Parser;
use clap_verbosity_flag::Verbosity;

/// Runs the prefetch warming pipeline: keeps a content-addressed store
/// warm from URLs discovered in a source checkout, and serves the store
/// over HTTP in a layout compatible with Bazel's `repository_cache`.
#[derive(Parser)]
#[command(name = "prefetch-server", version, about, long_about = None)]
pub struct Cli {
    /// Path to `server_config.json`.
    pub server_config: PathBuf,

    /// Path to `prefetches.json`.
    pub prefetches_config: PathBuf,

    #[command(flatten)]
    pub verbosity: Verbosity,
}
