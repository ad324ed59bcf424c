use std::path::Path;
use std::time::Duration;

use prefetch_matchers::Package;

use crate::error::{LoadError, ValidationError};
use crate::schema::{PrefetchConfig, ServerConfig};

/// Loads and validates `server.json`. `$home` in `server.workdir` is
/// expanded against the current user's home directory, same as the
/// reference's `strings.ReplaceAll(serverConfig.Server.Workdir, "$home",
/// os.Getenv("HOME"))`.
pub fn load_server_config(path: &Path) -> Result<ServerConfig, LoadError> {
    let raw = read_json(path)?;
    let mut config: ServerConfig = parse_json(path, &raw)?;
    config.server.workdir = expand_home(&config.server.workdir);
    validate_server_config(&config)?;
    Ok(config)
}

/// Loads `prefetches.json` and builds its packages against `src_dir`.
/// Building a matcher only fails for an unrecognized `type`; everything
/// else about a matcher (missing files, bad regex) surfaces later, lazily,
/// at match time.
pub fn load_prefetch_config(path: &Path, src_dir: &Path) -> Result<Vec<Package>, LoadError> {
    let raw = read_json(path)?;
    let config: PrefetchConfig = parse_json(path, &raw)?;

    config
        .items
        .iter()
        .map(|p| {
            Package::from_config(src_dir, p).map_err(|reason| {
                LoadError::Validation(ValidationError::InvalidValue { field: "items[].url_matcher/hash_matcher", reason })
            })
        })
        .collect()
}

/// Converts the cleanup section's `max_age` (days, as written in
/// `server.json`) into a `Duration`, matching the reference's implicit
/// `× 86400` days-to-seconds conversion.
pub fn cleanup_max_age(config: &ServerConfig) -> Duration {
    Duration::from_secs(config.server.cleanup.max_age.saturating_mul(86400))
}

fn read_json(path: &Path) -> Result<String, LoadError> {
    fs_err::read_to_string(path).map_err(|source| LoadError::ReadFile { path: path.to_path_buf(), source: source.into() })
}

fn parse_json<T: serde::de::DeserializeOwned>(path: &Path, raw: &str) -> Result<T, LoadError> {
    serde_json::from_str(raw).map_err(|source| LoadError::Parse { path: path.to_path_buf(), source })
}

fn expand_home(workdir: &str) -> String {
    let home = dirs::home_dir().map(|p| p.display().to_string()).unwrap_or_default();
    workdir.replace("$home", &home)
}

fn validate_server_config(config: &ServerConfig) -> Result<(), ValidationError> {
    if config.server.port == 0 {
        return Err(ValidationError::InvalidValue { field: "server.port", reason: "must be nonzero".to_string() });
    }
    if config.server.scheduler.interval == 0 {
        return Err(ValidationError::InvalidValue {
            field: "server.scheduler.interval",
            reason: "must be greater than 0".to_string(),
        });
    }
    parse_hhmm(&config.server.scheduler.start_time, "server.scheduler.start_time")?;
    parse_hhmm(&config.server.scheduler.end_time, "server.scheduler.end_time")?;

    if !config.downloaders.iter().any(|d| d.name == config.server.downloader) {
        return Err(ValidationError::InvalidValue {
            field: "server.downloader",
            reason: format!("no downloader named '{}' is configured", config.server.downloader),
        });
    }
    Ok(())
}

/// Parses `HH:MM` into `(hour, minute)`, validating ranges. The reference
/// parses this with Go's `time.Parse("15:04", ...)`; this is the equivalent
/// without pulling in a datetime crate just for two bounded integers.
pub fn parse_hhmm(value: &str, field: &'static str) -> Result<(u32, u32), ValidationError> {
    let invalid = || ValidationError::InvalidValue { field, reason: format!("'{value}' is not HH:MM") };
    let (h, m) = value.split_once(':').ok_or_else(invalid)?;
    let hour: u32 = h.parse().map_err(|_| invalid())?;
    let minute: u32 = m.parse().map_err(|_| invalid())?;
    if hour > 23 || minute > 59 {
        return Err(invalid());
    }
    Ok((hour, minute))
}
