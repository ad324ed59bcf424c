use chrono::{DateTime, Utc};

/// One row of the `items` table: a package that has been downloaded,
/// verified, and installed into the store at least once.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerRecord {
    pub id: Option<i64>,
    pub size: i64,
    pub path: String,
    pub url: String,
    pub hash: String,
    pub url_hash: String,
    pub downloaded_at: DateTime<Utc>,
}

impl LedgerRecord {
    pub fn new(size: i64, path: impl Into<String>, url: impl Into<String>, hash: impl Into<String>, url_hash: impl Into<String>) -> Self {
        Self {
            id: None,
            size,
            path: path.into(),
            url: url.into(),
            hash: hash.into(),
            url_hash: url_hash.into(),
            downloaded_at: Utc::now(),
        }
    }
}
