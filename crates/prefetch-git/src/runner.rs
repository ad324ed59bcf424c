use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::SourceError;

/// A single git invocation's outcome: combined stdout+stderr and whether it
/// exited zero. Abstracted behind [`CommandRunner`] so the refresh sequence
/// can be tested without ever shelling out to a real `git`.
pub trait CommandRunner: Send + Sync {
    fn run(&self, repo_path: &Path, args: &[&str]) -> Result<(), (String, bool)>;
}

/// Runs `git -C <repo_path> <args>`, matching the reference runner's
/// `exec.Command("git", "-C", repoPath, ...)` invocations exactly.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, repo_path: &Path, args: &[&str]) -> Result<(), (String, bool)> {
        let output = Command::new("git").arg("-C").arg(repo_path).args(args).output();
        match output {
            Ok(output) if output.status.success() => Ok(()),
            Ok(output) => {
                let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
                combined.push_str(&String::from_utf8_lossy(&output.stderr));
                Err((combined, false))
            }
            Err(e) => Err((e.to_string(), true)),
        }
    }
}

const MAX_ATTEMPTS: u32 = 3;

/// Keeps a working copy synced with `origin/master`: fetch, checkout
/// master, hard-reset to `origin/master`, then recursively update
/// submodules. Each of the four steps is retried independently up to three
/// times before the whole refresh is considered failed — the reference
/// implementation runs these steps uninterrupted but this pipeline ticks on
/// a schedule where a single transient network blip shouldn't cost an
/// entire cycle (cf. `rattler_networking`'s default of three retries for
/// its own HTTP requests).
pub struct SourceRefresher<R: CommandRunner = SystemCommandRunner> {
    repo_path: PathBuf,
    runner: R,
}

impl SourceRefresher<SystemCommandRunner> {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self { repo_path: repo_path.into(), runner: SystemCommandRunner }
    }
}

impl<R: CommandRunner> SourceRefresher<R> {
    pub fn with_runner(repo_path: impl Into<PathBuf>, runner: R) -> Self {
        Self { repo_path: repo_path.into(), runner }
    }

    /// Resets the working tree to `origin/master`, discarding local changes.
    pub fn reset(&self) -> Result<(), SourceError> {
        self.run_with_retry("reset", &["reset", "--hard", "origin/master"])
    }

    /// Fetches from origin, checks out master, hard-resets to
    /// `origin/master`, then updates submodules recursively.
    pub fn update(&self) -> Result<(), SourceError> {
        self.run_with_retry("fetch", &["fetch", "origin"])?;
        self.run_with_retry("checkout", &["checkout", "master"])?;
        self.run_with_retry("reset", &["reset", "--hard", "origin/master"])?;
        self.run_with_retry("submodule update", &["submodule", "update", "--init", "--recursive"])?;
        Ok(())
    }

    fn run_with_retry(&self, step: &'static str, args: &[&str]) -> Result<(), SourceError> {
        let mut last_output = String::new();
        for attempt in 1..=MAX_ATTEMPTS {
            match self.runner.run(&self.repo_path, args) {
                Ok(()) => return Ok(()),
                Err((output, _is_spawn_error)) => {
                    tracing::warn!(step, attempt, %output, "git step failed, retrying");
                    last_output = output;
                }
            }
        }
        Err(SourceError::StepFailed { step, attempts: MAX_ATTEMPTS, output: last_output })
    }
}
