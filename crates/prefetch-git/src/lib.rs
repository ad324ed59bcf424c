//! Keeps a source checkout synced with `origin/master` (and its submodules)
//! ahead of each analysis tick.

pub mod error;
pub mod runner;

pub use error::SourceError;
pub use runner::{CommandRunner, SourceRefresher, SystemCommandRunner};
