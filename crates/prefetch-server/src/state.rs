use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

/// Shared state handed to every HTTP handler. `data_root` is read-only from
/// the handlers' point of view (the pipeline writes it); `commands` is the
/// only structure HTTP handlers mutate, guarded by a single mutex held for
/// the duration of each handler, matching the reference server's one
/// `sync.Mutex` around its `[][]string` command list.
#[derive(Clone)]
pub struct AppState {
    pub data_root: PathBuf,
    pub commands: Arc<Mutex<Vec<Vec<String>>>>,
}

impl AppState {
    pub fn new(data_root: PathBuf) -> Self {
        Self { data_root, commands: Arc::new(Mutex::new(Vec::new())) }
    }
}
