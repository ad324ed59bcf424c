//! A name-keyed registry of subprocess-backed downloaders, each built from a
//! [`DownloaderSpec`] describing the command to run, its default arguments,
//! and URL-pattern-gated extra arguments.

pub mod error;
pub mod registry;
pub mod spec;
pub mod subprocess;

pub use error::DownloadError;
pub use registry::DownloaderRegistry;
pub use spec::{ArgRule, DownloaderSpec};
pub use subprocess::SubprocessDownloader;
