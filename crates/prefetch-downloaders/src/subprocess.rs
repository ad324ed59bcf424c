use std::process::{Command, Stdio};

use crate::error::DownloadError;
use crate::spec::DownloaderSpec;

/// A downloader built from a [`DownloaderSpec`]: runs `spec.cmd` with
/// `spec.default_args`, plus any rule's `args` whose `pattern` matches the
/// URL being downloaded, with `$out`/`$url` placeholders substituted.
#[derive(Debug, Clone)]
pub struct SubprocessDownloader {
    spec: DownloaderSpec,
}

impl SubprocessDownloader {
    pub fn new(spec: DownloaderSpec) -> Self {
        Self { spec }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Downloads `url` to `out_path`. Blocking: runs the subprocess on the
    /// calling thread and waits for it to exit, streaming its stdout/stderr
    /// straight through to this process's own (matching the reference's
    /// `io.Copy(os.Stdout, stdout)` passthrough). Callers driving this from
    /// an async context should run it via `spawn_blocking`.
    pub fn download(&self, url: &str, out_path: &std::path::Path) -> Result<(), DownloadError> {
        let args = self.build_args(url, out_path)?;
        tracing::info!(downloader = %self.spec.name, cmd = %self.spec.cmd, ?args, url, "starting download");

        let status = Command::new(&self.spec.cmd)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|source| DownloadError::Spawn { cmd: self.spec.cmd.clone(), source })?;

        if !status.success() {
            return Err(DownloadError::NonZeroExit { cmd: self.spec.cmd.clone(), status: status.to_string() });
        }
        Ok(())
    }

    fn build_args(&self, url: &str, out_path: &std::path::Path) -> Result<Vec<String>, DownloadError> {
        let mut args = self.spec.default_args.clone();

        for rule in &self.spec.rules {
            let pattern = regex::Regex::new(&rule.matcher.pattern)
                .map_err(|source| DownloadError::InvalidRulePattern { pattern: rule.matcher.pattern.clone(), source })?;
            if pattern.is_match(url) {
                tracing::debug!(pattern = %rule.matcher.pattern, "arg rule matched, adding args");
                args.extend(rule.args.iter().cloned());
            }
        }

        let out_str = out_path.to_string_lossy();
        for arg in &mut args {
            match arg.as_str() {
                "$out" => *arg = out_str.to_string(),
                "$url" => *arg = url.to_string(),
                _ => {}
            }
        }
        Ok(args)
    }
}
