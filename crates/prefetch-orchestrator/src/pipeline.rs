use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use prefetch_cache::{CasStore, Janitor, JanitorLimits};
use prefetch_core::{ItemError, PrefetchItem};
use prefetch_downloaders::DownloaderRegistry;
use prefetch_git::{CommandRunner, SourceRefresher, SystemCommandRunner};
use prefetch_ledger::{Ledger, LedgerRecord};
use prefetch_matchers::Package;

/// Everything one tick needs. Constructed once at startup and handed to
/// every `run_tick` call; cheap to clone (everything heavy is behind `Arc`)
/// so the scheduler loop and the HTTP server can share it.
///
/// Generic over the git [`CommandRunner`] for the same reason
/// `SourceRefresher` is: tests drive a tick end-to-end with a fake runner
/// instead of shelling out to a real `git`.
#[derive(Clone)]
pub struct PipelineContext<R: CommandRunner = SystemCommandRunner> {
    pub source: Arc<SourceRefresher<R>>,
    pub packages: Arc<Vec<Package>>,
    pub store: Arc<CasStore>,
    pub downloaders: Arc<DownloaderRegistry>,
    pub downloader_name: String,
    pub ledger: Arc<Ledger>,
    pub downloads_dir: PathBuf,
    pub subprocess_timeout: Duration,
    pub janitor_limits: JanitorLimits,
}

#[derive(Debug, Default, Clone)]
pub struct TickReport {
    pub source_refreshed: bool,
    pub installed: usize,
    pub already_cached: usize,
    pub failed: usize,
}

/// Runs one full pipeline tick: refresh the source tree, discover items,
/// download/verify/install the ones not already cached, record them in the
/// ledger, then sweep the store. Mirrors §4.E's ordering exactly: when the
/// source refresh fails, no packages are analyzed and the tick falls
/// straight through to the janitor.
pub async fn run_tick<R: CommandRunner + 'static>(ctx: &PipelineContext<R>) -> TickReport {
    let mut report = TickReport::default();

    report.source_refreshed = refresh_source(ctx).await;

    if report.source_refreshed {
        let items = discover_items(ctx).await;
        tracing::info!(count = items.len(), "discovered candidate items");

        for item in items {
            match process_item(ctx, item).await {
                ItemOutcome::Installed => report.installed += 1,
                ItemOutcome::AlreadyCached => report.already_cached += 1,
                ItemOutcome::Failed => report.failed += 1,
            }
        }
    } else {
        tracing::warn!("source refresh failed, skipping discovery and download for this tick");
    }

    sweep_leftover_downloads(&ctx.downloads_dir).await;
    run_janitor(ctx).await;

    report
}

async fn refresh_source<R: CommandRunner + 'static>(ctx: &PipelineContext<R>) -> bool {
    let source = ctx.source.clone();
    let attempt = tokio::task::spawn_blocking(move || source.update());
    match tokio::time::timeout(ctx.subprocess_timeout, attempt).await {
        Ok(Ok(Ok(()))) => true,
        Ok(Ok(Err(err))) => {
            tracing::warn!(error = %err, "source refresh failed");
            false
        }
        Ok(Err(join_err)) => {
            tracing::error!(error = %join_err, "source refresh task panicked");
            false
        }
        Err(_elapsed) => {
            tracing::warn!(timeout = ?ctx.subprocess_timeout, "source refresh timed out");
            false
        }
    }
}

async fn discover_items<R: CommandRunner>(ctx: &PipelineContext<R>) -> Vec<PrefetchItem> {
    let packages = ctx.packages.clone();
    tokio::task::spawn_blocking(move || prefetch_matchers::analyze_packages(&packages))
        .await
        .unwrap_or_else(|join_err| {
            tracing::error!(error = %join_err, "matcher analysis task panicked");
            Vec::new()
        })
}

enum ItemOutcome {
    Installed,
    AlreadyCached,
    Failed,
}

async fn process_item<R: CommandRunner>(ctx: &PipelineContext<R>, mut item: PrefetchItem) -> ItemOutcome {
    if probe(ctx, &item) {
        tracing::debug!(url = %item.url, "already present in the store");
        return ItemOutcome::AlreadyCached;
    }

    let temp_path = allocate_temp_path(&ctx.downloads_dir);
    if let Err(e) = fs_err::create_dir_all(&ctx.downloads_dir) {
        tracing::error!(error = %e, "failed to create downloads dir");
        return ItemOutcome::Failed;
    }

    if let Err(err) = download(ctx, &item, &temp_path).await {
        item.mark_failed(ItemError::download(err));
        tracing::warn!(url = %item.url, error = %item.error.as_ref().unwrap(), "download failed");
        let _ = std::fs::remove_file(&temp_path);
        return ItemOutcome::Failed;
    }

    let computed_hash = match prefetch_core::sha256_hex_file(&temp_path) {
        Ok(h) => h,
        Err(e) => {
            tracing::error!(url = %item.url, error = %e, "failed to hash downloaded file");
            let _ = std::fs::remove_file(&temp_path);
            return ItemOutcome::Failed;
        }
    };

    if item.has_hash() {
        let expected = item.expected_hash.clone().unwrap();
        if expected != computed_hash {
            item.mark_failed(ItemError::integrity(&expected, &computed_hash));
            tracing::warn!(url = %item.url, expected, computed_hash, "hash mismatch, not installing");
            let _ = std::fs::remove_file(&temp_path);
            return ItemOutcome::Failed;
        }
    } else {
        item.adopt_computed_hash(computed_hash.clone());
    }

    let size = match fs_err::metadata(&temp_path) {
        Ok(m) => m.len(),
        Err(e) => {
            tracing::error!(error = %e, "failed to stat downloaded file");
            let _ = std::fs::remove_file(&temp_path);
            return ItemOutcome::Failed;
        }
    };
    item.size = Some(size);

    let entry = match ctx.store.install(&computed_hash, &temp_path, &item.url_hash) {
        Ok(entry) => entry,
        Err(e) => {
            item.mark_failed(ItemError::install(e.to_string()));
            tracing::error!(url = %item.url, error = %e, "install failed");
            return ItemOutcome::Failed;
        }
    };
    item.local_path = Some(entry.bucket_dir.clone());

    let record = LedgerRecord::new(size as i64, entry.bucket_dir.display().to_string(), item.url.as_str(), &computed_hash, &item.url_hash);
    if let Err(e) = ctx.ledger.create_or_update(&record) {
        tracing::error!(url = %item.url, error = %e, "failed to record ledger entry");
    }

    tracing::info!(url = %item.url, hash = %computed_hash, "installed item");
    ItemOutcome::Installed
}

fn probe<R: CommandRunner>(ctx: &PipelineContext<R>, item: &PrefetchItem) -> bool {
    if item.has_hash() {
        ctx.store.probe(item.expected_hash.as_deref().unwrap_or_default(), &item.url_hash).is_some()
    } else {
        ctx.store.probe_by_url_hash(&item.url_hash).ok().flatten().is_some()
    }
}

async fn download<R: CommandRunner>(ctx: &PipelineContext<R>, item: &PrefetchItem, temp_path: &std::path::Path) -> Result<(), String> {
    let downloader = ctx
        .downloaders
        .get(&ctx.downloader_name)
        .map_err(|e| e.to_string())?
        .clone();
    let url = item.url.to_string();
    let dest = temp_path.to_path_buf();

    let attempt = tokio::task::spawn_blocking(move || downloader.download(&url, &dest));
    match tokio::time::timeout(ctx.subprocess_timeout, attempt).await {
        Ok(Ok(Ok(()))) => Ok(()),
        Ok(Ok(Err(e))) => Err(e.to_string()),
        Ok(Err(join_err)) => Err(join_err.to_string()),
        Err(_elapsed) => Err("download timed out".to_string()),
    }
}

fn allocate_temp_path(downloads_dir: &std::path::Path) -> PathBuf {
    let bytes: [u8; 8] = rand::random();
    downloads_dir.join(hex::encode(bytes))
}

async fn sweep_leftover_downloads(downloads_dir: &std::path::Path) {
    let dir = downloads_dir.to_path_buf();
    let _ = tokio::task::spawn_blocking(move || {
        if let Ok(entries) = std::fs::read_dir(&dir) {
            for entry in entries.flatten() {
                if let Err(e) = std::fs::remove_file(entry.path()) {
                    tracing::debug!(path = ?entry.path(), error = %e, "failed to remove leftover temp file");
                }
            }
        }
    })
    .await;
}

async fn run_janitor<R: CommandRunner>(ctx: &PipelineContext<R>) {
    let store_root = ctx.store.root().to_path_buf();
    let limits = ctx.janitor_limits;
    let cas_dir = store_root.join("content_addressable").join("sha256");
    let result = tokio::task::spawn_blocking(move || Janitor::new(limits).sweep(&cas_dir)).await;
    match result {
        Ok(Ok(report)) => {
            tracing::info!(freed = report.freed, removed = report.removed.len(), "janitor sweep complete");
        }
        Ok(Err(e)) => tracing::warn!(error = %e, "janitor sweep failed"),
        Err(join_err) => tracing::error!(error = %join_err, "janitor task panicked"),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use prefetch_core::sha256_hex_str;
    use prefetch_downloaders::{DownloaderRegistry, DownloaderSpec};
    use prefetch_git::SourceRefresher;
    use prefetch_matchers::{MatcherSpec, Package};

    /// Always succeeds, recording every invocation, so `update()` never
    /// touches a real `git` binary.
    #[derive(Default)]
    struct FakeRunner;

    impl CommandRunner for FakeRunner {
        fn run(&self, _repo_path: &std::path::Path, _args: &[&str]) -> Result<(), (String, bool)> {
            Ok(())
        }
    }

    /// Always fails the first step, so `update()` exhausts its retries and
    /// the tick falls straight through to the janitor without discovery.
    struct AlwaysFailingRunner;

    impl CommandRunner for AlwaysFailingRunner {
        fn run(&self, _repo_path: &std::path::Path, _args: &[&str]) -> Result<(), (String, bool)> {
            Err(("simulated failure".to_string(), false))
        }
    }

    fn downloader_that_copies(fixture: &std::path::Path) -> DownloaderRegistry {
        DownloaderRegistry::from_specs([DownloaderSpec {
            name: "test-cp".to_string(),
            cmd: "cp".to_string(),
            default_args: vec![fixture.display().to_string(), "$out".to_string()],
            rules: vec![],
        }])
    }

    fn package_with_known_hash(url: &str, content: &[u8]) -> Package {
        Package {
            name: "pkg".to_string(),
            url_matcher: MatcherSpec::Hardcoded(url.to_string()),
            hash_matcher: MatcherSpec::Hardcoded(prefetch_core::sha256_hex_bytes(content)),
        }
    }

    fn context(tmp: &tempfile::TempDir, packages: Vec<Package>, fixture: &std::path::Path) -> PipelineContext<FakeRunner> {
        context_with_runner(tmp, packages, fixture, FakeRunner)
    }

    fn context_with_runner<R: CommandRunner>(
        tmp: &tempfile::TempDir,
        packages: Vec<Package>,
        fixture: &std::path::Path,
        runner: R,
    ) -> PipelineContext<R> {
        let store_root = tmp.path().join("store");
        std::fs::create_dir_all(&store_root).unwrap();
        PipelineContext {
            source: Arc::new(SourceRefresher::with_runner(tmp.path().join("repo"), runner)),
            packages: Arc::new(packages),
            store: Arc::new(CasStore::new(store_root)),
            downloaders: Arc::new(downloader_that_copies(fixture)),
            downloader_name: "test-cp".to_string(),
            ledger: Arc::new(Ledger::open_in_memory().unwrap()),
            downloads_dir: tmp.path().join("downloads"),
            subprocess_timeout: Duration::from_secs(5),
            janitor_limits: JanitorLimits { max_size: u64::MAX, tolerant_size: u64::MAX, max_age: Duration::from_secs(3600) },
        }
    }

    fn write_fixture(tmp: &tempfile::TempDir, content: &[u8]) -> PathBuf {
        let path = tmp.path().join("fixture.bin");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn warm_path_downloads_verifies_installs_and_records() {
        let tmp = tempfile::tempdir().unwrap();
        let content = b"package bytes";
        let fixture = write_fixture(&tmp, content);
        let url = "https://example.com/pkg.tgz";
        let ctx = context(&tmp, vec![package_with_known_hash(url, content)], &fixture);

        let report = run_tick(&ctx).await;
        assert_eq!(report.installed, 1);
        assert_eq!(report.failed, 0);

        let hash = prefetch_core::sha256_hex_bytes(content);
        let url_hash = sha256_hex_str(url);
        assert!(ctx.store.probe(&hash, &url_hash).is_some());
        assert!(ctx.ledger.get_by_url(url).unwrap().is_some());
    }

    #[tokio::test]
    async fn already_cached_item_is_skipped_on_the_next_tick() {
        let tmp = tempfile::tempdir().unwrap();
        let content = b"package bytes";
        let fixture = write_fixture(&tmp, content);
        let url = "https://example.com/pkg.tgz";
        let ctx = context(&tmp, vec![package_with_known_hash(url, content)], &fixture);

        run_tick(&ctx).await;
        std::fs::remove_file(&fixture).unwrap();

        let second = run_tick(&ctx).await;
        assert_eq!(second.installed, 0);
        assert_eq!(second.already_cached, 1);
    }

    #[tokio::test]
    async fn unknown_hash_item_is_recognized_by_url_alias_on_repeat() {
        // Drives `process_item` directly with a hash-less `PrefetchItem`,
        // since a package whose hash matcher is unmatched (`Nil` included)
        // is now skipped before it ever reaches the pipeline — this lane
        // only still matters for items that already made it past that gate.
        let tmp = tempfile::tempdir().unwrap();
        let content = b"unknown hash package";
        let fixture = write_fixture(&tmp, content);
        let url = "https://example.com/unknown.tgz";
        let ctx = context(&tmp, vec![], &fixture);

        let item = prefetch_core::PrefetchItem::new(url::Url::parse(url).unwrap(), None);
        let outcome = process_item(&ctx, item.clone()).await;
        assert!(matches!(outcome, ItemOutcome::Installed));

        assert!(ctx.store.probe_by_url_hash(&sha256_hex_str(url)).unwrap().is_some());

        let second_outcome = process_item(&ctx, item).await;
        assert!(matches!(second_outcome, ItemOutcome::AlreadyCached));
    }

    #[tokio::test]
    async fn hash_mismatch_fails_the_item_and_cleans_up_the_temp_file() {
        let tmp = tempfile::tempdir().unwrap();
        let content = b"actual bytes";
        let fixture = write_fixture(&tmp, content);
        let url = "https://example.com/mismatch.tgz";
        let package = Package {
            name: "pkg".to_string(),
            url_matcher: MatcherSpec::Hardcoded(url.to_string()),
            hash_matcher: MatcherSpec::Hardcoded("0".repeat(64)),
        };
        let ctx = context(&tmp, vec![package], &fixture);

        let report = run_tick(&ctx).await;
        assert_eq!(report.failed, 1);
        assert_eq!(report.installed, 0);

        let entries: Vec<_> = std::fs::read_dir(&ctx.downloads_dir).map(|e| e.flatten().collect()).unwrap_or_default();
        assert!(entries.is_empty(), "temp file should have been removed after a failed install");
    }

    #[tokio::test]
    async fn source_refresh_failure_skips_discovery_but_still_sweeps() {
        let tmp = tempfile::tempdir().unwrap();
        let content = b"never downloaded";
        let fixture = write_fixture(&tmp, content);
        let url = "https://example.com/skipped.tgz";
        let ctx = context_with_runner(&tmp, vec![package_with_known_hash(url, content)], &fixture, AlwaysFailingRunner);

        let report = run_tick(&ctx).await;
        assert!(!report.source_refreshed);
        assert_eq!(report.installed, 0);
        assert_eq!(report.already_cached, 0);
        assert_eq!(report.failed, 0);
    }
}
