use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingRequiredField(&'static str),

    #[error("invalid value for field {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read config file '{path}': {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },

    #[error("failed to parse config file '{path}': {source}")]
    Parse { path: PathBuf, source: serde_json::Error },

    #[error("config validation failed: {0}")]
    Validation(#[from] ValidationError),
}
