use std::collections::HashMap;

use crate::error::DownloadError;
use crate::spec::DownloaderSpec;
use crate::subprocess::SubprocessDownloader;

/// Builds a [`SubprocessDownloader`] for each configured
/// [`DownloaderSpec`], keyed by name, and hands them out by name. Unlike
/// the reference factory (which only ever wires up one hardcoded "aria2"
/// downloader kind), every configured downloader here is the same generic
/// subprocess shape — what varies is the spec, not the Rust type.
#[derive(Debug, Default)]
pub struct DownloaderRegistry {
    downloaders: HashMap<String, SubprocessDownloader>,
}

impl DownloaderRegistry {
    pub fn from_specs(specs: impl IntoIterator<Item = DownloaderSpec>) -> Self {
        let downloaders = specs.into_iter().map(|s| (s.name.clone(), SubprocessDownloader::new(s))).collect();
        Self { downloaders }
    }

    pub fn get(&self, name: &str) -> Result<&SubprocessDownloader, DownloadError> {
        self.downloaders.get(name).ok_or_else(|| DownloadError::UnknownDownloader(name.to_string()))
    }
}
