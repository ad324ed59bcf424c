//! Loads and validates `server.json` and `prefetches.json`. Parsing and
//! validation are kept as separate passes: a malformed file is a
//! [`error::LoadError::Parse`], but a well-formed file with nonsensical
//! values (a zero interval, a downloader name nothing configures) is a
//! separate [`error::ValidationError`].

pub mod error;
pub mod loader;
pub mod schema;

pub use error::{LoadError, ValidationError};
pub use loader::{cleanup_max_age, load_prefetch_config, load_server_config, parse_hhmm};
pub use schema::{CleanupSection, PrefetchConfig, SchedulerSection, ServerConfig, ServerSection};
