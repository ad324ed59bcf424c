mod app;
mod cli;
mod routes;
mod state;

use std::future::IntoFuture;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use prefetch_cache::{CasStore, JanitorLimits};
use prefetch_downloaders::DownloaderRegistry;
use prefetch_git::SourceRefresher;
use prefetch_ledger::Ledger;
use prefetch_orchestrator::{run_forever, PipelineContext, Scheduler};

use cli::Cli;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.verbosity.log_level_filter().to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = prefetch_config::load_server_config(&cli.server_config).context("loading server config")?;
    let workdir = PathBuf::from(&config.server.workdir);
    let src_dir = workdir.join("src");
    let data_dir = workdir.join("data");
    let downloads_dir = workdir.join("downloads");

    fs_err::create_dir_all(&src_dir).context("creating src dir")?;
    fs_err::create_dir_all(&data_dir).context("creating data dir")?;
    fs_err::create_dir_all(&downloads_dir).context("creating downloads dir")?;

    let packages = prefetch_config::load_prefetch_config(&cli.prefetches_config, &src_dir).context("loading prefetches.json")?;

    let store = CasStore::new(data_dir.clone());
    let downloaders = DownloaderRegistry::from_specs(config.downloaders.clone());
    let ledger = Ledger::open(&workdir.join("prefetch.db")).context("opening ledger")?;
    let source = SourceRefresher::new(src_dir);

    // `cleanup.enabled = false` is honored by widening the bounds so a sweep
    // never finds anything to remove, rather than threading a separate flag
    // through the pipeline context.
    let janitor_limits = if config.server.cleanup.enabled {
        JanitorLimits {
            max_size: config.server.cleanup.max_size,
            tolerant_size: config.server.cleanup.tolerant_size,
            max_age: prefetch_config::cleanup_max_age(&config),
        }
    } else {
        JanitorLimits { max_size: u64::MAX, tolerant_size: u64::MAX, max_age: Duration::from_secs(u64::MAX) }
    };

    let (hour, minute) = prefetch_config::parse_hhmm(&config.server.scheduler.start_time, "server.scheduler.start_time")
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    let start = chrono::NaiveTime::from_hms_opt(hour, minute, 0).expect("validated by parse_hhmm");
    let (hour, minute) =
        prefetch_config::parse_hhmm(&config.server.scheduler.end_time, "server.scheduler.end_time").map_err(|e| anyhow::anyhow!("{e}"))?;
    let end = chrono::NaiveTime::from_hms_opt(hour, minute, 0).expect("validated by parse_hhmm");
    let scheduler = Scheduler::new(Duration::from_secs(config.server.scheduler.interval), start, end);

    let pipeline_ctx = PipelineContext {
        source: Arc::new(source),
        packages: Arc::new(packages),
        store: Arc::new(store),
        downloaders: Arc::new(downloaders),
        downloader_name: config.server.downloader.clone(),
        ledger: Arc::new(ledger),
        downloads_dir,
        subprocess_timeout: Duration::from_secs(config.server.timeout),
        janitor_limits,
    };

    let app_state = AppState::new(data_dir);
    let router = app::build_router(app_state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "listening");

    let scheduler_handle = tokio::spawn(run_forever(pipeline_ctx, scheduler));

    let server = axum::serve(listener, router).with_graceful_shutdown(shutdown_signal());
    tokio::select! {
        result = server.into_future() => {
            result.context("http server failed")?;
        }
        _ = scheduler_handle => {
            tracing::error!("scheduler loop exited unexpectedly");
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received");
}
