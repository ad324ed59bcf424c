//! Ties the scheduler's time-of-day/interval gate to the per-tick pipeline:
//! source refresh, matcher discovery, download/verify/install, ledger
//! recording, and a final janitor sweep.

pub mod pipeline;
pub mod scheduler;

pub use pipeline::{run_tick, PipelineContext, TickReport};
pub use scheduler::Scheduler;

use chrono::{Local, Utc};
use prefetch_git::CommandRunner;

/// Runs the scheduler loop forever: wakes up, checks whether a tick is due,
/// runs one if so, then sleeps for whatever the scheduler says is next.
/// Intended to be driven from a dedicated blocking task (see the binary
/// crate), alongside the HTTP server running on the same runtime.
pub async fn run_forever<R: CommandRunner + 'static>(ctx: PipelineContext<R>, mut scheduler: Scheduler) -> ! {
    loop {
        let wall_clock_now = Utc::now();
        // The exclusion window is specified as local time-of-day (matching
        // the reference's `time.Now()`, which is machine-local), not UTC.
        let now = Local::now().time();

        if scheduler.should_run(now, wall_clock_now) {
            tracing::info!("tick due, running pipeline");
            let report = run_tick(&ctx).await;
            tracing::info!(
                installed = report.installed,
                already_cached = report.already_cached,
                failed = report.failed,
                source_refreshed = report.source_refreshed,
                "tick complete"
            );
            scheduler.record_run(Utc::now());
        }

        let sleep_for = scheduler.sleep_time(now, wall_clock_now);
        tokio::time::sleep(sleep_for.max(std::time::Duration::from_secs(1))).await;
    }
}
