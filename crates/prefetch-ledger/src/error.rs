#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("failed to open ledger database at '{path}': {source}")]
    Open { path: String, source: rusqlite::Error },

    #[error("ledger query failed: {0}")]
    Query(#[from] rusqlite::Error),
}
